//! Route definitions for the HTTP API.
//!
//! ```text
//! /api/v1
//! ├── /health      GET  - Health check
//! └── /exchange    POST - Compare offers for a conversion
//! ```

use crate::api::handlers::{AppState, compare_rates, health_check};
use axum::{Router, routing::get, routing::post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_v1 = Router::new()
        .route("/health", get(health_check))
        .route("/exchange", post(compare_rates));

    Router::new()
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
