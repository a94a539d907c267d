mod config;
mod rules;

pub use config::ScoringConfig;

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::currency::{ConversionError, CurrencyRateSnapshot};
use super::domain::{QuoteRequestId, QuoteResponse, SupplierId, SupplierPerformanceRecord};

/// Stateless scorer applying [`ScoringConfig`] to one request's quotes.
pub struct ScoringEngine {
    config: ScoringConfig,
}

/// Per-component contribution, kept so buyers can audit a ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub price: f64,
    pub delivery: f64,
    pub quality: f64,
    pub payment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedQuote {
    pub rank: usize,
    pub response: QuoteResponse,
    pub supplier_id: SupplierId,
    pub normalized_price: Decimal,
    pub scores: ScoreBreakdown,
    pub total: u8,
}

/// Ranked comparison for a single request, computed against exactly one rate snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteComparison {
    pub request_id: QuoteRequestId,
    pub base_currency: String,
    pub rate_snapshot_version: u64,
    pub entries: Vec<RankedQuote>,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Score and rank `responses`. Pure: identical inputs give an identical ordering.
    ///
    /// Any response in a currency missing from `snapshot`, or whose base price does not fit in
    /// a decimal, aborts the whole comparison.
    pub fn compare(
        &self,
        request_id: &QuoteRequestId,
        responses: &[QuoteResponse],
        performance: &BTreeMap<SupplierId, SupplierPerformanceRecord>,
        snapshot: &CurrencyRateSnapshot,
    ) -> Result<QuoteComparison, ConversionError> {
        let normalized = responses
            .iter()
            .map(|response| {
                snapshot
                    .normalize(response.total_price, &response.currency)
                    .map(|price| (response, price))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = match bounds(&normalized) {
            Some((cheapest, earliest, latest)) => normalized
                .into_iter()
                .map(|(response, normalized_price)| {
                    let scores = ScoreBreakdown {
                        price: rules::price_score(cheapest, normalized_price),
                        delivery: rules::delivery_score(response.delivery_date, earliest, latest),
                        quality: rules::quality_score(
                            performance.get(&response.supplier_id),
                            &self.config,
                        ),
                        payment: rules::payment_score(response.payment_terms_days, &self.config),
                    };
                    let total = rules::total_score([
                        scores.price,
                        scores.delivery,
                        scores.quality,
                        scores.payment,
                    ]);
                    RankedQuote {
                        rank: 0,
                        response: response.clone(),
                        supplier_id: response.supplier_id.clone(),
                        normalized_price,
                        scores,
                        total,
                    }
                })
                .collect::<Vec<_>>(),
            None => Vec::new(),
        };

        entries.sort_by(ranking_order);
        for (index, entry) in entries.iter_mut().enumerate() {
            entry.rank = index + 1;
        }

        Ok(QuoteComparison {
            request_id: request_id.clone(),
            base_currency: snapshot.base_currency.clone(),
            rate_snapshot_version: snapshot.version,
            entries,
        })
    }
}

fn bounds(normalized: &[(&QuoteResponse, Decimal)]) -> Option<(Decimal, NaiveDate, NaiveDate)> {
    let cheapest = normalized.iter().map(|(_, price)| *price).min()?;
    let earliest = normalized.iter().map(|(r, _)| r.delivery_date).min()?;
    let latest = normalized.iter().map(|(r, _)| r.delivery_date).max()?;
    Some((cheapest, earliest, latest))
}

// total desc, normalized price asc, delivery asc, then id for a total order
fn ranking_order(left: &RankedQuote, right: &RankedQuote) -> Ordering {
    right
        .total
        .cmp(&left.total)
        .then_with(|| left.normalized_price.cmp(&right.normalized_price))
        .then_with(|| {
            left.response
                .delivery_date
                .cmp(&right.response.delivery_date)
        })
        .then_with(|| left.response.id.cmp(&right.response.id))
}
