//! Conversion requests, offers and comparison results

use super::comparator::CompareError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of fractional digits kept on a converted amount.
pub const CONVERTED_SCALE: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRequest {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
}

impl ConversionRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: Decimal) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }

    /// Checks that the request carries everything a provider needs.
    pub fn validate(&self) -> Result<(), CompareError> {
        if self.from.trim().is_empty() {
            return Err(CompareError::InvalidInput(
                "source currency is required".to_string(),
            ));
        }
        if self.primary_target().is_none() {
            return Err(CompareError::InvalidInput(
                "target currency is required".to_string(),
            ));
        }
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(CompareError::InvalidInput(format!(
                "amount must not be negative, got {}",
                self.amount
            )));
        }
        Ok(())
    }

    /// Normalized source currency code.
    pub fn source(&self) -> String {
        self.from.trim().to_uppercase()
    }

    /// Normalized target codes. `to` may hold a comma separated list.
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for code in self.to.split(',') {
            let code = code.trim().to_uppercase();
            if !code.is_empty() && !targets.contains(&code) {
                targets.push(code);
            }
        }
        targets
    }

    pub fn primary_target(&self) -> Option<String> {
        self.targets().into_iter().next()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub provider_label: String,
    pub converted_rate: Decimal,
    pub latency_ms: u64,
}

impl Offer {
    /// Builds an offer for `amount` converted at `rate`.
    ///
    /// The converted amount is rounded to [`CONVERTED_SCALE`] digits, half away from zero.
    pub fn from_rate(
        provider_label: impl Into<String>,
        amount: Decimal,
        rate: Decimal,
        elapsed: Duration,
    ) -> Option<Self> {
        let converted = amount.checked_mul(rate)?;
        Some(Self {
            provider_label: provider_label.into(),
            converted_rate: round_converted(converted),
            latency_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        })
    }
}

pub fn round_converted(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CONVERTED_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub best_offer: Offer,
    pub all_offers: Vec<Offer>,
}

impl ComparisonResult {
    /// Picks the highest converted amount; the earliest offer wins a tie.
    ///
    /// Returns `None` when there is nothing to compare.
    pub fn from_offers(all_offers: Vec<Offer>) -> Option<Self> {
        let best_offer = all_offers
            .iter()
            .reduce(|best, offer| {
                if offer.converted_rate > best.converted_rate {
                    offer
                } else {
                    best
                }
            })?
            .clone();

        Some(Self {
            best_offer,
            all_offers,
        })
    }
}
