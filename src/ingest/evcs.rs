/// evcs.vn station page client
///
/// Retrieves the public status page of one charging station and scrapes
/// the per-tier port availability out of its visible text.
///
/// The page has no API; each tier is rendered as a line such as
/// `✧ 150kW trống 2/4 cổng` ("150kW free 2/4 ports"). Patterns for those
/// lines live in `crate::tiers`.

use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use std::time::Duration;

use crate::logging::{self, Component};
use crate::model::{NetworkError, StationSnapshot, Tier, TierReading};
use crate::tiers;

const USER_AGENT: &str = concat!("evcs_monitor/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Fetcher
// ============================================================================

/// Something that can produce the current page body.
///
/// The polling cycle only depends on this trait, so tests can substitute
/// canned pages or failures for the live site.
pub trait PageSource {
    fn fetch(&self) -> Result<String, NetworkError>;

    /// Where the page comes from, for log lines.
    fn describe(&self) -> String;
}

/// Fetches the page over HTTP with a bounded timeout.
pub struct HttpPageSource {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpPageSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NetworkError::Request(e.to_string()))?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl PageSource for HttpPageSource {
    fn fetch(&self) -> Result<String, NetworkError> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "text/html")
            .send()
            .map_err(classify_request_error)?;

        if !response.status().is_success() {
            return Err(NetworkError::HttpStatus(response.status().as_u16()));
        }

        response.text().map_err(|e| NetworkError::Body(e.to_string()))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

fn classify_request_error(e: reqwest::Error) -> NetworkError {
    if e.is_timeout() {
        NetworkError::Timeout(e.to_string())
    } else if e.is_connect() {
        NetworkError::Connect(e.to_string())
    } else {
        NetworkError::Request(e.to_string())
    }
}

// ============================================================================
// Parser
// ============================================================================

static TIER_PATTERNS: LazyLock<Vec<(Tier, Regex)>> = LazyLock::new(|| {
    Tier::ALL
        .into_iter()
        .map(|tier| {
            let re = Regex::new(&tiers::tier_pattern(tier))
                .expect("tier patterns are built from constants");
            (tier, re)
        })
        .collect()
});

/// Reduce an HTML document to its visible text: every text node trimmed,
/// empty ones dropped, the rest joined by single spaces.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find one tier's reading in the page text.
///
/// Returns `None` when the tier line is missing, when a count does not fit
/// in a `u32`, or when the page claims more free ports than exist.
pub fn extract_tier_reading(text: &str, tier: Tier) -> Option<TierReading> {
    let re = TIER_PATTERNS
        .iter()
        .find(|(t, _)| *t == tier)
        .map(|(_, re)| re)?;
    let caps = re.captures(text)?;

    let parse_count = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
    let (Some(free), Some(total)) = (parse_count(1), parse_count(2)) else {
        logging::warn(
            Component::Parse,
            Some(tier.label()),
            &format!("Port count out of range in '{}'", &caps[0]),
        );
        return None;
    };

    match TierReading::new(free, total) {
        Ok(reading) => Some(reading),
        Err(e) => {
            logging::warn(
                Component::Parse,
                Some(tier.label()),
                &format!("Ignoring implausible reading: {}", e),
            );
            None
        }
    }
}

/// Build a snapshot from a raw page body. Tiers that cannot be found are
/// left out; this never fails.
pub fn parse_snapshot(html: &str) -> StationSnapshot {
    let text = html_to_text(html);

    let snapshot: StationSnapshot = Tier::ALL
        .into_iter()
        .filter_map(|tier| extract_tier_reading(&text, tier).map(|r| (tier, r)))
        .collect();

    logging::log_parse_summary(snapshot.len(), Tier::ALL.len());
    snapshot
}

// ============================================================================
// Tests
// ============================================================================
