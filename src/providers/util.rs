use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("fxcmp/", env!("CARGO_PKG_VERSION"));
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds the HTTP client a provider keeps for its lifetime.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

pub fn trim_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Runs `operation` unless `cancel` fires first, in which case `None` is returned.
///
/// Dropping the operation aborts any request it has in flight.
pub async fn until_cancelled<F, T>(cancel: &CancellationToken, operation: F) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("Request cancelled");
            None
        }
        value = operation => Some(value),
    }
}

/// Folds the outcome of a cancellable fetch into a rate, logging ordinary failures.
pub fn settle_rate(provider: &str, outcome: Option<Result<Option<Decimal>>>) -> Option<Decimal> {
    match outcome {
        None => None,
        Some(Ok(Some(rate))) => Some(rate),
        Some(Ok(None)) => {
            debug!(provider, "No rate available for currency pair");
            None
        }
        Some(Err(e)) => {
            warn!(provider, error = %format!("{e:#}"), "Quote request failed");
            None
        }
    }
}

/// Parses a rate given either as a JSON number or a numeric string.
pub fn parse_rate(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::String(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .ok(),
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate(&json!("0.92")), Decimal::from_str("0.92").ok());
        assert_eq!(parse_rate(&json!(" 1.5 ")), Decimal::from_str("1.5").ok());
        assert_eq!(parse_rate(&json!(0.5)), Decimal::from_str("0.5").ok());
        assert_eq!(parse_rate(&json!(3)), Some(Decimal::from(3)));
        assert_eq!(parse_rate(&json!("1e-2")), Decimal::from_str("0.01").ok());
        assert!(parse_rate(&json!("abc")).is_none());
        assert!(parse_rate(&json!(null)).is_none());
    }

    #[test]
    fn test_trim_base_url() {
        assert_eq!(trim_base_url("http://a.b/api/"), "http://a.b/api");
        assert_eq!(trim_base_url("http://a.b"), "http://a.b");
    }

    #[tokio::test]
    async fn test_until_cancelled() {
        let cancel = CancellationToken::new();
        assert_eq!(until_cancelled(&cancel, async { 7 }).await, Some(7));

        cancel.cancel();
        assert_eq!(until_cancelled(&cancel, async { 7 }).await, None);
    }
}
