/// Tier registry for the monitored charging station.
///
/// Defines the power tiers the station advertises, along with their
/// metadata and the page text pattern each one is scraped with. This is
/// the single place to edit when the page markup changes; the parser
/// compiles its patterns from here and nowhere else.

use crate::model::Tier;

// ---------------------------------------------------------------------------
// Page vocabulary
// ---------------------------------------------------------------------------

/// Bullet character preceding every tier line on the page.
pub const TIER_MARKER: &str = "✧";

/// Page word for "free" (unoccupied ports).
pub const FREE_WORD: &str = "trống";

/// Page word for "ports".
pub const PORTS_WORD: &str = "cổng";

// ---------------------------------------------------------------------------
// Tier metadata
// ---------------------------------------------------------------------------

pub struct TierSpec {
    pub tier: Tier,
    /// Rated output per port, in kilowatts.
    pub rated_kw: f64,
    /// What kind of connector the tier represents at this station.
    pub description: &'static str,
}

/// All tiers, in the order they appear on the page.
pub static TIER_REGISTRY: &[TierSpec] = &[
    TierSpec {
        tier: Tier::Kw150,
        rated_kw: 150.0,
        description: "DC ultra-fast chargers",
    },
    TierSpec {
        tier: Tier::Kw120,
        rated_kw: 120.0,
        description: "DC fast chargers",
    },
    TierSpec {
        tier: Tier::Kw60,
        rated_kw: 60.0,
        description: "DC standard chargers",
    },
    TierSpec {
        tier: Tier::Kw3_5,
        rated_kw: 3.5,
        description: "AC slow chargers (two-wheelers)",
    },
];

/// Regex source for one tier's line, conceptually
/// `✧ <label> trống <free> / <total> cổng`, tolerant of irregular spacing.
///
/// Capture group 1 is the free count, group 2 the total.
pub fn tier_pattern(tier: Tier) -> String {
    format!(
        r"{}\s*{}\s*{}\s*([0-9]+)\s*/\s*([0-9]+)\s*{}",
        regex::escape(TIER_MARKER),
        regex::escape(tier.label()),
        FREE_WORD,
        PORTS_WORD
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
