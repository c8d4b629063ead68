use std::process::ExitCode;

use evcs_monitor::config::MonitorConfig;
use evcs_monitor::logging::{self, Component};
use evcs_monitor::monitor::Monitor;
use evcs_monitor::tiers::TIER_REGISTRY;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match MonitorConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(
        config.log.level,
        config.log.file.as_deref(),
        config.log.console_timestamps,
    );

    if let Err(e) = config.ensure_dirs() {
        logging::error(
            Component::System,
            None,
            &format!("Cannot create data folders: {}", e),
        );
        return ExitCode::FAILURE;
    }

    for spec in TIER_REGISTRY {
        logging::debug(
            Component::System,
            Some(spec.tier.label()),
            &format!("Tracking {} ({} kW per port)", spec.description, spec.rated_kw),
        );
    }

    let mut monitor = match Monitor::from_config(&config) {
        Ok(monitor) => monitor,
        Err(e) => {
            logging::error(
                Component::System,
                None,
                &format!("Cannot build HTTP client: {}", e),
            );
            return ExitCode::FAILURE;
        }
    };

    monitor.run_forever()
}
