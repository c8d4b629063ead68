/// Data ingestion for the charging station monitor.
///
/// Submodules:
/// - `evcs` — fetches the public station page and scrapes tier readings out of it.

pub mod evcs;
