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

pub const LABEL: &str = "FreeCurrencyApi";

/// Quotes from freecurrencyapi.com, which prices a base currency against a list of targets.
pub struct FreeCurrencyProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize, Debug)]
struct LatestResponse {
    #[serde(default)]
    data: HashMap<String, serde_json::Value>,
}

impl FreeCurrencyProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(FreeCurrencyProvider {
            client: http_client()?,
            base_url: trim_base_url(&config.base_url),
            api_key: config.api_key.clone(),
        })
    }

    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Option<Decimal>> {
        let url = format!("{}/v1/latest", self.base_url);
        debug!("Requesting rates from {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("base_currency", from),
                ("currencies", to),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send rate request for {from}->{to}"))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Rate request rejected");
            return Ok(None);
        }

        let payload: LatestResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse rate response for {from}->{to}"))?;

        Ok(payload.data.get(to).and_then(parse_rate))
    }
}

#[async_trait]
impl QuoteProvider for FreeCurrencyProvider {
    fn name(&self) -> &str {
        LABEL
    }

    #[instrument(name = "free_currency", skip_all)]
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
        if from.is_empty() || cancel.is_cancelled() {
            return Ok(None);
        }

        if from == to {
            return Ok(Offer::from_rate(
                LABEL,
                request.amount,
                Decimal::ONE,
                started.elapsed(),
            ));
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
