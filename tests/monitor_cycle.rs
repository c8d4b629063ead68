/// Integration tests for the full polling cycle
///
/// Tests verify:
/// 1. First run logs every parsed tier and saves a baseline
/// 2. A changed tier is logged to both sinks and the snapshot is replaced
/// 3. An unchanged page writes nothing (state file untouched)
/// 4. Fetch and storage failures abort the cycle without partial writes
///
/// Every test works in its own temp directory with a canned page source,
/// so no network access is needed.

use std::cell::RefCell;
use std::fs;

use chrono::{NaiveDate, NaiveDateTime};
use evcs_monitor::config::MonitorConfig;
use evcs_monitor::ingest::evcs::PageSource;
use evcs_monitor::model::{CycleError, NetworkError, StationSnapshot, StorageError, Tier, TierReading};
use evcs_monitor::monitor::{CycleOutcome, Monitor};
use evcs_monitor::store::StateStore;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// A page source whose body can be swapped between cycles.
struct StaticPage(RefCell<Result<String, NetworkError>>);

impl StaticPage {
    fn new(body: Result<String, NetworkError>) -> Self {
        Self(RefCell::new(body))
    }

    fn set(&self, body: Result<String, NetworkError>) {
        *self.0.borrow_mut() = body;
    }
}

impl PageSource for &StaticPage {
    fn fetch(&self) -> Result<String, NetworkError> {
        self.0.borrow().clone()
    }

    fn describe(&self) -> String {
        "static test page".to_string()
    }
}

fn station_page(tiers: &[(&str, u32, u32)]) -> Result<String, NetworkError> {
    let mut html = String::from("<html><body><h1>Trạm sạc</h1><div class=\"status\">");
    for (label, free, total) in tiers {
        html.push_str(&format!(
            "<p><span>✧</span> <strong>{}</strong> trống <b>{}</b>/<b>{}</b> cổng</p>",
            label, free, total
        ));
    }
    html.push_str("</div></body></html>");
    Ok(html)
}

fn setup() -> (TempDir, MonitorConfig) {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = MonitorConfig::in_log_dir(dir.path().join("logs"));
    config.ensure_dirs().expect("log dir");
    (dir, config)
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, 1)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn reading(free: u32, total: u32) -> TierReading {
    TierReading::new(free, total).unwrap()
}

fn text_lines(config: &MonitorConfig) -> Vec<String> {
    fs::read_to_string(&config.text_log_path)
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

fn csv_lines(config: &MonitorConfig) -> Vec<String> {
    fs::read_to_string(&config.tabular_log_path)
        .unwrap_or_default()
        .lines()
        .map(String::from)
        .collect()
}

// ---------------------------------------------------------------------------
// 1. Baseline
// ---------------------------------------------------------------------------

#[test]
fn test_first_run_logs_single_tier_and_saves_baseline() {
    let (_dir, config) = setup();
    let page = StaticPage::new(station_page(&[("150kW", 2, 4)]));
    let mut monitor = Monitor::with_source(&config, &page);

    let outcome = monitor.run_cycle_at(at(10, 0)).expect("cycle should succeed");

    assert!(matches!(outcome, CycleOutcome::Baseline { .. }));
    assert_eq!(outcome.logged().len(), 1);
    assert_eq!(outcome.logged()[0].tier, Tier::Kw150);

    assert_eq!(
        text_lines(&config),
        vec!["[2025-06-01 10:00:00] 150kW: Free 2/4 | Charging 2"]
    );
    assert_eq!(
        csv_lines(&config),
        vec![
            "Time,Tier,Free Ports,Total Ports,Vehicles Charging",
            "2025-06-01 10:00:00,150kW,2,4,2",
        ]
    );

    let saved = StateStore::new(&config.state_path).load().unwrap();
    let expected: StationSnapshot = [(Tier::Kw150, reading(2, 4))].into_iter().collect();
    assert_eq!(saved, Some(expected));
}

#[test]
fn test_first_run_with_unreadable_page_still_saves_baseline() {
    let (_dir, config) = setup();
    let page = StaticPage::new(Ok("<html><body>Bảo trì</body></html>".to_string()));
    let mut monitor = Monitor::with_source(&config, &page);

    let outcome = monitor.run_cycle_at(at(10, 0)).unwrap();

    assert_eq!(outcome, CycleOutcome::Baseline { logged: vec![] });
    assert!(text_lines(&config).is_empty());
    assert_eq!(
        StateStore::new(&config.state_path).load().unwrap(),
        Some(StationSnapshot::new())
    );
}

// ---------------------------------------------------------------------------
// 2. Changes
// ---------------------------------------------------------------------------

#[test]
fn test_change_against_persisted_snapshot() {
    let (_dir, config) = setup();
    let store = StateStore::new(&config.state_path);
    let previous: StationSnapshot = [(Tier::Kw60, reading(1, 2))].into_iter().collect();
    store.save(&previous).unwrap();

    let page = StaticPage::new(station_page(&[("60kW", 0, 2)]));
    let mut monitor = Monitor::with_source(&config, &page);
    let outcome = monitor.run_cycle_at(at(11, 15)).unwrap();

    assert!(matches!(outcome, CycleOutcome::Changed { .. }));
    let logged = outcome.logged();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].reading, reading(0, 2));
    assert_eq!(logged[0].reading.charging(), 2);

    let expected: StationSnapshot = [(Tier::Kw60, reading(0, 2))].into_iter().collect();
    assert_eq!(store.load().unwrap(), Some(expected));
}

#[test]
fn test_only_changed_tiers_are_logged() {
    let (_dir, config) = setup();
    let page = StaticPage::new(station_page(&[
        ("150kW", 2, 4),
        ("120kW", 1, 2),
        ("60kW", 2, 2),
        ("3.5kW", 5, 6),
    ]));
    let mut monitor = Monitor::with_source(&config, &page);
    monitor.run_cycle_at(at(8, 0)).unwrap();

    page.set(station_page(&[
        ("150kW", 1, 4),
        ("120kW", 1, 2),
        ("60kW", 2, 2),
        ("3.5kW", 4, 6),
    ]));
    let outcome = monitor.run_cycle_at(at(8, 1)).unwrap();

    let tiers: Vec<Tier> = outcome.logged().iter().map(|e| e.tier).collect();
    assert_eq!(tiers, vec![Tier::Kw150, Tier::Kw3_5]);

    let lines = text_lines(&config);
    assert_eq!(lines.len(), 6, "4 baseline lines + 2 change lines");
    assert_eq!(lines[4], "[2025-06-01 08:01:00] 150kW: Free 1/4 | Charging 3");
    assert_eq!(lines[5], "[2025-06-01 08:01:00] 3.5kW: Free 4/6 | Charging 2");
    assert_eq!(csv_lines(&config).len(), 7, "header + 6 rows");
}

#[test]
fn test_vanished_tier_is_not_logged_and_dropped_on_next_save() {
    let (_dir, config) = setup();
    let page = StaticPage::new(station_page(&[("150kW", 2, 4), ("3.5kW", 0, 6)]));
    let mut monitor = Monitor::with_source(&config, &page);
    monitor.run_cycle_at(at(9, 0)).unwrap();

    // 3.5kW disappears from the page: nothing to report.
    page.set(station_page(&[("150kW", 2, 4)]));
    assert_eq!(monitor.run_cycle_at(at(9, 1)).unwrap(), CycleOutcome::Unchanged);

    // A later change rewrites the snapshot without the missing tier.
    page.set(station_page(&[("150kW", 3, 4)]));
    monitor.run_cycle_at(at(9, 2)).unwrap();
    let saved = StateStore::new(&config.state_path).load().unwrap().unwrap();
    assert!(saved.get(Tier::Kw3_5).is_none());
    assert_eq!(saved.get(Tier::Kw150), Some(&reading(3, 4)));
}

// ---------------------------------------------------------------------------
// 3. No change
// ---------------------------------------------------------------------------

#[test]
fn test_identical_cycles_do_not_rewrite_state() {
    let (_dir, config) = setup();
    let page = StaticPage::new(station_page(&[("150kW", 2, 4), ("60kW", 1, 2)]));
    let mut monitor = Monitor::with_source(&config, &page);
    monitor.run_cycle_at(at(12, 0)).unwrap();

    let before_content = fs::read(&config.state_path).unwrap();
    let before_mtime = fs::metadata(&config.state_path).unwrap().modified().unwrap();
    let before_lines = text_lines(&config).len();

    std::thread::sleep(std::time::Duration::from_millis(20));
    let outcome = monitor.run_cycle_at(at(12, 1)).unwrap();

    assert_eq!(outcome, CycleOutcome::Unchanged);
    assert!(outcome.logged().is_empty());
    assert_eq!(fs::read(&config.state_path).unwrap(), before_content);
    assert_eq!(
        fs::metadata(&config.state_path).unwrap().modified().unwrap(),
        before_mtime
    );
    assert_eq!(text_lines(&config).len(), before_lines);
}

// ---------------------------------------------------------------------------
// 4. Failures
// ---------------------------------------------------------------------------

#[test]
fn test_fetch_failure_writes_nothing_and_next_cycle_recovers() {
    let (_dir, config) = setup();
    let page = StaticPage::new(station_page(&[("120kW", 1, 2)]));
    let mut monitor = Monitor::with_source(&config, &page);
    monitor.run_cycle_at(at(7, 0)).unwrap();
    let saved_before = fs::read(&config.state_path).unwrap();

    page.set(Err(NetworkError::Connect("connection refused".to_string())));
    let result = monitor.run_cycle_at(at(7, 1));
    assert!(matches!(result, Err(CycleError::Network(NetworkError::Connect(_)))));
    assert_eq!(fs::read(&config.state_path).unwrap(), saved_before);
    assert_eq!(text_lines(&config).len(), 1);

    page.set(station_page(&[("120kW", 0, 2)]));
    let outcome = monitor.run_cycle_at(at(7, 2)).unwrap();
    assert!(matches!(outcome, CycleOutcome::Changed { .. }));
}

#[test]
fn test_http_error_status_aborts_cycle() {
    let (_dir, config) = setup();
    let page = StaticPage::new(Err(NetworkError::HttpStatus(500)));
    let mut monitor = Monitor::with_source(&config, &page);

    let result = monitor.run_cycle_at(at(7, 0));
    assert_eq!(result, Err(CycleError::Network(NetworkError::HttpStatus(500))));
    assert!(!config.state_path.exists());
}

#[test]
fn test_corrupt_state_file_is_reported_and_left_in_place() {
    let (_dir, config) = setup();
    fs::write(&config.state_path, "{ truncated").unwrap();
    let page = StaticPage::new(station_page(&[("150kW", 2, 4)]));
    let mut monitor = Monitor::with_source(&config, &page);

    let result = monitor.run_cycle_at(at(7, 0));
    assert!(matches!(
        result,
        Err(CycleError::Storage(StorageError::Corrupt { .. }))
    ));
    assert_eq!(fs::read_to_string(&config.state_path).unwrap(), "{ truncated");
    assert!(text_lines(&config).is_empty());
}

#[test]
fn test_unwritable_log_keeps_previous_snapshot() {
    let (_dir, mut config) = setup();
    let page = StaticPage::new(station_page(&[("60kW", 1, 2)]));
    Monitor::with_source(&config, &page).run_cycle_at(at(6, 0)).unwrap();
    let saved_before = fs::read(&config.state_path).unwrap();

    // A directory where the CSV file should be makes every append fail.
    config.tabular_log_path = config.state_path.with_file_name("blocked.csv");
    fs::create_dir(&config.tabular_log_path).unwrap();
    page.set(station_page(&[("60kW", 0, 2)]));

    let result = Monitor::with_source(&config, &page).run_cycle_at(at(6, 1));
    assert!(matches!(
        result,
        Err(CycleError::Storage(StorageError::Write { .. }))
    ));
    assert_eq!(fs::read(&config.state_path).unwrap(), saved_before);
}
