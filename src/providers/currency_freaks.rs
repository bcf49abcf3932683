use super::util::{http_client, parse_rate, settle_rate, trim_base_url, until_cancelled};
use crate::core::config::ProviderConfig;
use crate::core::{ConversionRequest, Offer, QuoteProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

pub const LABEL: &str = "CurrencyFreaks";

/// Quotes from currencyfreaks.com. The API only publishes rates against its own base
/// currency, so any other pair is priced as a cross rate.
pub struct CurrencyFreaksProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize, Debug)]
struct LatestResponse {
    base: Option<String>,
    #[serde(default)]
    rates: HashMap<String, serde_json::Value>,
}

impl LatestResponse {
    fn rate_table(&self) -> HashMap<String, Decimal> {
        let mut table: HashMap<String, Decimal> = self
            .rates
            .iter()
            .filter_map(|(code, value)| parse_rate(value).map(|rate| (code.to_uppercase(), rate)))
            .collect();

        if let Some(base) = self.base.as_deref().map(|b| b.trim().to_uppercase()) {
            if !base.is_empty() {
                table.entry(base).or_insert(Decimal::ONE);
            }
        }
        table
    }
}

fn cross_rate(table: &HashMap<String, Decimal>, from: &str, to: &str) -> Option<Decimal> {
    let from_rate = table.get(from)?;
    let to_rate = table.get(to)?;
    to_rate
        .checked_div(*from_rate)
        .filter(|rate| *rate > Decimal::ZERO)
}

impl CurrencyFreaksProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(CurrencyFreaksProvider {
            client: http_client()?,
            base_url: trim_base_url(&config.base_url),
            api_key: config.api_key.clone(),
        })
    }

    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Option<Decimal>> {
        let url = format!("{}/v2.0/rates/latest", self.base_url);
        debug!("Requesting rates from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .context("Failed to send latest rates request")?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Rate request rejected");
            return Ok(None);
        }

        let payload: LatestResponse = response
            .json()
            .await
            .context("Failed to parse latest rates response")?;

        Ok(cross_rate(&payload.rate_table(), from, to))
    }
}

#[async_trait]
impl QuoteProvider for CurrencyFreaksProvider {
    fn name(&self) -> &str {
        LABEL
    }

    #[instrument(name = "currency_freaks", skip_all)]
    async fn try_get_quote(
        &self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<Offer>> {
        let started = Instant::now();
        let from = request.source();
        let Some(to) = request.primary_target() else {
            return Ok(None);
        };
        if from.is_empty() {
            return Ok(None);
        }

        let outcome = until_cancelled(cancel, self.fetch_rate(&from, &to)).await;
        let Some(rate) = settle_rate(LABEL, outcome) else {
            return Ok(None);
        };

        Ok(Offer::from_rate(
            LABEL,
            request.amount,
            rate,
            started.elapsed(),
        ))
    }
}
