//! Housecall server library logic.
//!
//! Wires the call record store, the telephony dialer, and the HTTP
//! surface together. The router exposes one write path per bridge event
//! stream and the three read endpoints of the query surface.

pub mod api_calls;
pub mod api_query;
pub mod background;
pub mod config;
pub mod dialer;

use axum::{
    routing::{get, post},
    Extension, Json, Router,
};
use dialer::Dialer;
use housecall_store::CallRecordStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
pub struct AppState {
    /// The call record store; single source of truth for call state.
    pub store: Arc<CallRecordStore>,
    /// Places outbound calls with the telephony provider.
    pub dialer: Arc<dyn Dialer>,
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/calls", post(api_calls::place_call_handler))
        .route(
            "/api/calls/{id}/status",
            post(api_calls::status_callback_handler).get(api_query::get_status_handler),
        )
        .route(
            "/api/calls/{id}/transcript",
            post(api_calls::transcript_event_handler).get(api_query::get_transcript_handler),
        )
        .route(
            "/api/calls/{id}/outcome",
            get(api_query::get_outcome_handler),
        )
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
