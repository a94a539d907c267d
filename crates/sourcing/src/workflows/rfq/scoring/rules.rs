use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::super::domain::SupplierPerformanceRecord;
use super::config::ScoringConfig;

/// Proportional to how close the quote is to the cheapest normalized price.
pub(crate) fn price_score(cheapest: Decimal, price_base: Decimal) -> f64 {
    if price_base <= Decimal::ZERO || cheapest >= price_base {
        return ScoringConfig::PRICE_MAX;
    }
    let ratio = (cheapest / price_base).to_f64().unwrap_or(0.0);
    (ScoringConfig::PRICE_MAX * ratio).clamp(0.0, ScoringConfig::PRICE_MAX)
}

/// Linear between the earliest (full score) and latest (zero) delivery dates in the set.
pub(crate) fn delivery_score(delivery: NaiveDate, earliest: NaiveDate, latest: NaiveDate) -> f64 {
    let span = (latest - earliest).num_days();
    if span <= 0 {
        return ScoringConfig::DELIVERY_MAX;
    }
    let offset = (delivery - earliest).num_days() as f64;
    let fraction = 1.0 - offset / span as f64;
    (ScoringConfig::DELIVERY_MAX * fraction).clamp(0.0, ScoringConfig::DELIVERY_MAX)
}

/// Historical quality; suppliers without delivered orders get the configured default.
pub(crate) fn quality_score(
    record: Option<&SupplierPerformanceRecord>,
    config: &ScoringConfig,
) -> f64 {
    record
        .filter(|record| record.has_history())
        .map(|record| record.quality_score)
        .unwrap_or(config.default_quality_score)
        .clamp(0.0, ScoringConfig::QUALITY_MAX)
}

/// Longer buyer-favorable terms score higher, saturating at the configured cap.
pub(crate) fn payment_score(payment_terms_days: u32, config: &ScoringConfig) -> f64 {
    let cap = config.payment_terms_cap_days;
    if cap == 0 {
        return ScoringConfig::PAYMENT_MAX;
    }
    let terms = payment_terms_days.min(cap) as f64;
    ScoringConfig::PAYMENT_MAX * terms / cap as f64
}

/// Round to the nearest integer and clamp into the 0..=100 band.
pub(crate) fn total_score(components: [f64; 4]) -> u8 {
    let sum: f64 = components.iter().sum();
    sum.round().clamp(0.0, 100.0) as u8
}
