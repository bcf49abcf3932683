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

pub const LABEL: &str = "Fixer";

/// Rates on fixer.io are always published against EUR.
const FIXER_BASE: &str = "EUR";

pub struct FixerProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize, Debug)]
struct LatestResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rates: HashMap<String, serde_json::Value>,
}

fn eur_relative_rate(
    rates: &HashMap<String, serde_json::Value>,
    from: &str,
    to: &str,
) -> Option<Decimal> {
    let from_rate = rates.get(from).and_then(parse_rate);
    let to_rate = rates.get(to).and_then(parse_rate);

    let rate = match (from_rate, to_rate) {
        (_, Some(to_rate)) if from == FIXER_BASE => Some(to_rate),
        (Some(from_rate), _) if to == FIXER_BASE => Decimal::ONE.checked_div(from_rate),
        (Some(from_rate), Some(to_rate)) => to_rate.checked_div(from_rate),
        _ => None,
    }?;

    (rate > Decimal::ZERO).then_some(rate)
}

impl FixerProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(FixerProvider {
            client: http_client()?,
            base_url: trim_base_url(&config.base_url),
            api_key: config.api_key.clone(),
        })
    }

    async fn fetch_rate(&self, from: &str, targets: &[String]) -> Result<Option<Decimal>> {
        let Some(to) = targets.first() else {
            return Ok(None);
        };

        let mut symbols = vec![from.to_string()];
        symbols.extend(targets.iter().filter(|t| t.as_str() != from).cloned());
        let symbols = symbols.join(",");

        let url = format!("{}/latest", self.base_url);
        debug!("Requesting rates from {} for {}", url, symbols);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("access_key", self.api_key.as_str()),
                ("symbols", symbols.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to send rate request for {symbols}"))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Rate request rejected");
            return Ok(None);
        }

        let payload: LatestResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse rate response for {symbols}"))?;

        if !payload.success || payload.rates.is_empty() {
            debug!("Upstream reported no rates");
            return Ok(None);
        }

        Ok(eur_relative_rate(&payload.rates, from, to))
    }
}

#[async_trait]
impl QuoteProvider for FixerProvider {
    fn name(&self) -> &str {
        LABEL
    }

    #[instrument(name = "fixer", skip_all)]
    async fn try_get_quote(
        &self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<Offer>> {
        let started = Instant::now();
        let from = request.source();
        let targets = request.targets();
        if from.len() != 3 || targets.is_empty() {
            return Ok(None);
        }

        let outcome = until_cancelled(cancel, self.fetch_rate(&from, &targets)).await;
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(symbols: &str, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/latest"))
            .and(query_param("access_key", "test-key"))
            .and(query_param("symbols", symbols))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(base_url: &str) -> FixerProvider {
        FixerProvider::new(&ProviderConfig {
            base_url: base_url.to_string(),
            api_key: "test-key".to_string(),
        })
        .unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn quote(provider: &FixerProvider, from: &str, to: &str) -> Option<Offer> {
        provider
            .try_get_quote(
                &ConversionRequest::new(from, to, Decimal::from(100)),
                &CancellationToken::new(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_quote_cross_rate() {
        let mock_server = create_mock_server(
            "USD,GBP",
            r#"{"success": true, "base": "EUR", "rates": {"USD": 1.25, "GBP": 0.85}}"#,
        )
        .await;
        let provider = provider(&mock_server.uri());

        let offer = quote(&provider, "usd", "gbp").await.unwrap();
        assert_eq!(offer.provider_label, LABEL);
        assert_eq!(offer.converted_rate, dec("68"));
    }

    #[tokio::test]
    async fn test_only_first_target_is_priced() {
        let mock_server = create_mock_server(
            "USD,GBP,JPY",
            r#"{"success": true, "rates": {"USD": 1.25, "GBP": 0.85, "JPY": 160}}"#,
        )
        .await;
        let provider = provider(&mock_server.uri());

        let offer = quote(&provider, "USD", "GBP, JPY").await.unwrap();
        assert_eq!(offer.converted_rate, dec("68"));
    }

    #[tokio::test]
    async fn test_unsuccessful_payload_is_absent() {
        let mock_server = create_mock_server(
            "USD,EUR",
            r#"{"success": false, "error": {"code": 101, "type": "invalid_access_key"}}"#,
        )
        .await;
        let provider = provider(&mock_server.uri());

        assert!(quote(&provider, "USD", "EUR").await.is_none());
    }

    #[tokio::test]
    async fn test_non_iso_source_is_absent() {
        let provider = provider("http://127.0.0.1:1");
        assert!(quote(&provider, "USDT", "EUR").await.is_none());
    }

    #[test]
    fn test_eur_relative_rate() {
        let rates = HashMap::from([
            ("USD".to_string(), json!(1.25)),
            ("GBP".to_string(), json!(0.85)),
            ("ZZZ".to_string(), json!(0)),
        ]);

        assert_eq!(eur_relative_rate(&rates, "EUR", "USD"), Some(dec("1.25")));
        assert_eq!(eur_relative_rate(&rates, "USD", "EUR"), Some(dec("0.8")));
        assert_eq!(eur_relative_rate(&rates, "USD", "GBP"), Some(dec("0.68")));
        assert_eq!(eur_relative_rate(&rates, "ZZZ", "USD"), None);
        assert_eq!(eur_relative_rate(&rates, "USD", "ZZZ"), None);
        assert_eq!(eur_relative_rate(&rates, "USD", "XYZ"), None);
    }
}
