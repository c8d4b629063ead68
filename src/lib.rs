/// Charging station occupancy monitor.
///
/// Polls the public status page of one EV charging station, extracts the
/// free/total port counts of each power tier, and appends a record to the
/// change logs whenever a tier's counts differ from the last saved snapshot.

pub mod changes;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod monitor;
pub mod store;
pub mod tiers;
