//! Quote provider abstraction

use super::exchange::{ConversionRequest, Offer};
use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A source of exchange-rate quotes.
///
/// Implementations turn their ordinary failures (network errors, bad payloads, unknown
/// currencies) into `Ok(None)`. An `Err` is reserved for unexpected faults and aborts the
/// whole comparison. Once `cancel` fires an in-flight call must return promptly.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn try_get_quote(
        &self,
        request: &ConversionRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<Offer>>;
}
