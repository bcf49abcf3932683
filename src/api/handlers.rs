//! Request handlers for the exchange endpoints.

use crate::core::{CompareError, ComparisonResult, ConversionRequest, RateComparator};
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    pub comparator: Arc<RateComparator>,
}

/// Body of `POST /api/v1/exchange`. Every field is optional here so that a missing one is
/// reported as invalid input rather than a deserialization failure.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ExchangeBody {
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: Option<Decimal>,
}

impl TryFrom<ExchangeBody> for ConversionRequest {
    type Error = CompareError;

    fn try_from(body: ExchangeBody) -> Result<Self, Self::Error> {
        let missing = |field: &str| CompareError::InvalidInput(format!("`{field}` is required"));
        Ok(ConversionRequest::new(
            body.from.ok_or_else(|| missing("from"))?,
            body.to.ok_or_else(|| missing("to"))?,
            body.value.ok_or_else(|| missing("value"))?,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

impl From<CompareError> for (StatusCode, Json<ErrorResponse>) {
    fn from(err: CompareError) -> Self {
        let status = match &err {
            CompareError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            CompareError::NoOffersAvailable { .. } => StatusCode::GATEWAY_TIMEOUT,
            CompareError::ProviderFault { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                code: err.kind().to_string(),
                message: err.to_string(),
            }),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub providers: Vec<String>,
}

/// `POST /api/v1/exchange`
///
/// The comparison is cancelled if the client goes away and this future is dropped.
#[instrument(skip_all)]
pub async fn compare_rates(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ExchangeBody>, JsonRejection>,
) -> Result<Json<ComparisonResult>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Unreadable request body");
        CompareError::InvalidInput(rejection.body_text())
    })?;
    let request = ConversionRequest::try_from(body)?;

    let cancel = CancellationToken::new();
    let _disconnect_guard = cancel.clone().drop_guard();

    let result = state.comparator.compare(&request, &cancel).await?;
    info!(
        provider = %result.best_offer.provider_label,
        offers = result.all_offers.len(),
        "Comparison served"
    );
    Ok(Json(result))
}

/// `GET /api/v1/health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        providers: state
            .comparator
            .provider_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_into_request() {
        let body = ExchangeBody {
            from: Some("USD".to_string()),
            to: Some("EUR".to_string()),
            value: Some(Decimal::from(100)),
        };
        let request = ConversionRequest::try_from(body).unwrap();
        assert_eq!(request.from, "USD");
        assert_eq!(request.amount, Decimal::from(100));
    }

    #[test]
    fn test_body_missing_field() {
        let body = ExchangeBody {
            from: Some("USD".to_string()),
            to: None,
            value: Some(Decimal::from(100)),
        };
        let err = ConversionRequest::try_from(body).unwrap_err();
        assert!(err.to_string().contains("`to` is required"));
    }

    #[test]
    fn test_error_status_mapping() {
        let (status, body): ApiError = CompareError::InvalidInput("x".to_string()).into();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code, "INVALID_INPUT");

        let (status, _): ApiError = CompareError::NoOffersAvailable {
            deadline: std::time::Duration::from_secs(10),
        }
        .into();
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);

        let (status, body): ApiError = CompareError::ProviderFault {
            provider: "P".to_string(),
            message: "boom".to_string(),
        }
        .into();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.message.contains("boom"));
    }
}
