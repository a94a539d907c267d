use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Point-in-time copy of the operator-maintained exchange rate table.
///
/// Rates are expressed as "one unit of `currency` is worth `rate` units of the base currency".
/// The base currency always converts at exactly one and never needs an explicit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyRateSnapshot {
    pub version: u64,
    pub base_currency: String,
    pub captured_at: DateTime<Utc>,
    rates: BTreeMap<String, Decimal>,
}

impl CurrencyRateSnapshot {
    pub fn new(
        base_currency: &str,
        version: u64,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, RateError> {
        let base_currency = normalize_currency_code(base_currency)
            .ok_or_else(|| RateError::InvalidCode(base_currency.to_string()))?;
        Ok(Self {
            version,
            base_currency,
            captured_at,
            rates: BTreeMap::new(),
        })
    }

    pub fn insert(&mut self, currency: &str, rate: Decimal) -> Result<(), RateError> {
        let code = normalize_currency_code(currency)
            .ok_or_else(|| RateError::InvalidCode(currency.to_string()))?;
        if rate <= Decimal::ZERO {
            return Err(RateError::NonPositive { currency: code });
        }
        if code != self.base_currency {
            self.rates.insert(code, rate);
        }
        Ok(())
    }

    pub fn with_rate(mut self, currency: &str, rate: Decimal) -> Result<Self, RateError> {
        self.insert(currency, rate)?;
        Ok(self)
    }

    pub fn rates(&self) -> &BTreeMap<String, Decimal> {
        &self.rates
    }

    pub fn rate(&self, currency: &str) -> Result<Decimal, MissingRate> {
        if currency.eq_ignore_ascii_case(&self.base_currency) {
            return Ok(Decimal::ONE);
        }
        let code = currency.to_ascii_uppercase();
        self.rates.get(&code).copied().ok_or(MissingRate {
            currency: code,
            version: self.version,
        })
    }

    /// Convert `amount` in `currency` to the base currency.
    pub fn normalize(&self, amount: Decimal, currency: &str) -> Result<Decimal, ConversionError> {
        let rate = self.rate(currency)?;
        amount
            .checked_mul(rate)
            .ok_or_else(|| ConversionError::OutOfRange {
                currency: currency.to_ascii_uppercase(),
                base_currency: self.base_currency.clone(),
            })
    }
}

/// Raised when a quote uses a currency the snapshot does not know.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no exchange rate for {currency} in rate snapshot v{version}")]
pub struct MissingRate {
    pub currency: String,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error(transparent)]
    MissingRate(#[from] MissingRate),
    #[error("{currency} amount is too large to express in {base_currency}")]
    OutOfRange {
        currency: String,
        base_currency: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateError {
    #[error("'{0}' is not a three-letter currency code")]
    InvalidCode(String),
    #[error("rate for {currency} must be positive")]
    NonPositive { currency: String },
    #[error("rate source unavailable: {0}")]
    Unavailable(String),
}

/// Upper-case a three-letter alphabetic code, rejecting anything else.
pub fn normalize_currency_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.len() == 3 && trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(trimmed.to_ascii_uppercase())
    } else {
        None
    }
}
