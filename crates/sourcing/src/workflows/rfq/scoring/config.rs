use serde::{Deserialize, Serialize};

/// Policy inputs for quote scoring. Component ceilings are fixed; these knobs are not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Payment terms at or beyond this many days earn the full payment score.
    pub payment_terms_cap_days: u32,
    /// Quality score used for suppliers without delivered orders.
    pub default_quality_score: f64,
}

impl ScoringConfig {
    pub const PRICE_MAX: f64 = 20.0;
    pub const DELIVERY_MAX: f64 = 40.0;
    pub const QUALITY_MAX: f64 = 30.0;
    pub const PAYMENT_MAX: f64 = 10.0;

    pub const DEFAULT_PAYMENT_TERMS_CAP_DAYS: u32 = 90;
    pub const DEFAULT_QUALITY_SCORE: f64 = 15.0;
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            payment_terms_cap_days: Self::DEFAULT_PAYMENT_TERMS_CAP_DAYS,
            default_quality_score: Self::DEFAULT_QUALITY_SCORE,
        }
    }
}
