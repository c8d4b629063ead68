/// Polling cycle for one charging station.
///
/// One cycle is fetch → parse → load previous → log changes → maybe save.
/// Cycles run strictly one after another; the interval is measured from the
/// end of one cycle to the start of the next.
///
/// # Clock injection
/// `run_cycle_at` takes the entry timestamp as a parameter so tests can
/// assert on exact log lines. `run_cycle` uses the local wall clock.

use chrono::{Local, NaiveDateTime};
use std::thread;
use std::time::Duration;

use crate::changes::{self, ChangeLogger};
use crate::config::MonitorConfig;
use crate::ingest::evcs::{self, HttpPageSource, PageSource};
use crate::logging::{self, Component};
use crate::model::{CycleError, LogEntry, NetworkError, TIMESTAMP_FORMAT};
use crate::store::StateStore;

/// What a successful cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No history existed; every parsed tier was logged and the snapshot
    /// saved unconditionally.
    Baseline { logged: Vec<LogEntry> },
    /// At least one tier changed; the snapshot was saved.
    Changed { logged: Vec<LogEntry> },
    /// Nothing changed; storage was not touched.
    Unchanged,
}

impl CycleOutcome {
    pub fn logged(&self) -> &[LogEntry] {
        match self {
            CycleOutcome::Baseline { logged } | CycleOutcome::Changed { logged } => {
                logged.as_slice()
            }
            CycleOutcome::Unchanged => &[],
        }
    }
}

pub struct Monitor<S: PageSource> {
    source: S,
    store: StateStore,
    change_log: ChangeLogger,
    poll_interval: Duration,
}

impl Monitor<HttpPageSource> {
    /// Monitor the configured URL over HTTP.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, NetworkError> {
        let source = HttpPageSource::new(&config.source_url, config.request_timeout)?;
        Ok(Self::with_source(config, source))
    }
}

impl<S: PageSource> Monitor<S> {
    pub fn with_source(config: &MonitorConfig, source: S) -> Self {
        Self {
            source,
            store: StateStore::new(&config.state_path),
            change_log: ChangeLogger::with_files(&config.tabular_log_path, &config.text_log_path),
            poll_interval: config.poll_interval,
        }
    }

    pub fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        self.run_cycle_at(Local::now().naive_local())
    }

    /// Run one cycle, stamping any log entries with `now`.
    pub fn run_cycle_at(&mut self, now: NaiveDateTime) -> Result<CycleOutcome, CycleError> {
        let html = self.source.fetch()?;
        let current = evcs::parse_snapshot(&html);
        let previous = self.store.load()?;

        logging::info(
            Component::Fetch,
            None,
            &format!("[{}] Current data: {}", now.format(TIMESTAMP_FORMAT), current),
        );

        let Some(previous) = previous else {
            logging::info(Component::Store, None, "🔰 First run, saving baseline.");
            let changed = changes::diff(&current, None);
            let logged = self.change_log.record(now, &changed)?;
            self.store.save(&current)?;
            return Ok(CycleOutcome::Baseline { logged });
        };

        let changed = changes::diff(&current, Some(&previous));
        if changed.is_empty() {
            logging::info(Component::Change, None, "⏸ No changes, nothing logged.");
            return Ok(CycleOutcome::Unchanged);
        }

        for change in &changed {
            let old = change
                .previous
                .map(|r| r.to_string())
                .unwrap_or_else(|| "n/a".to_string());
            logging::info(
                Component::Change,
                Some(change.tier.label()),
                &format!("⚡ Change at {}: {} ➜ {}", change.tier, old, change.current),
            );
        }

        let logged = self.change_log.record(now, &changed)?;
        self.store.save(&current)?;
        logging::info(Component::Store, None, "✅ Changes saved.");

        Ok(CycleOutcome::Changed { logged })
    }

    /// Poll until the process is terminated. A failed cycle is logged and
    /// retried at the next interval.
    pub fn run_forever(&mut self) -> ! {
        logging::info(
            Component::System,
            None,
            &format!("🚀 Monitoring charging station at: {}", self.source.describe()),
        );
        logging::info(
            Component::System,
            None,
            &format!("📂 State kept in: {}", self.store.path().display()),
        );

        loop {
            if let Err(e) = self.run_cycle() {
                logging::log_cycle_failure(&e);
            }
            thread::sleep(self.poll_interval);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
