//! Read-only query handlers for call records.
//!
//! Three endpoints, all keyed by call SID:
//! - `GET /api/calls/{id}/status`
//! - `GET /api/calls/{id}/transcript`
//! - `GET /api/calls/{id}/outcome`
//!
//! An unrecognized SID maps to a 404 JSON error on every endpoint.

use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use housecall_store::{StoreError, TranscriptEntry};
use housecall_types::{CallOutcome, CallStatus};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the query API.
#[derive(Debug, Error)]
pub enum QueryApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for QueryApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            QueryApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            QueryApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

fn map_store_error(e: StoreError) -> QueryApiError {
    match e {
        StoreError::NotFound(_) => QueryApiError::NotFound(e.to_string()),
        other => QueryApiError::Internal(other.to_string()),
    }
}

/// Response body for `GET /api/calls/{id}/status`.
#[derive(Debug, Serialize)]
pub struct CallStatusResponse {
    pub call_sid: String,
    pub status: CallStatus,
}

/// Handler for `GET /api/calls/{id}/status`.
pub async fn get_status_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_sid): Path<String>,
) -> Result<Json<CallStatusResponse>, QueryApiError> {
    let status = state.store.status(&call_sid).map_err(map_store_error)?;
    Ok(Json(CallStatusResponse { call_sid, status }))
}

/// Response body for `GET /api/calls/{id}/transcript`.
#[derive(Debug, Serialize)]
pub struct CallTranscriptResponse {
    pub call_sid: String,
    /// Entries in sequence order, regardless of arrival order.
    pub transcript: Vec<TranscriptEntry>,
}

/// Handler for `GET /api/calls/{id}/transcript`.
pub async fn get_transcript_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_sid): Path<String>,
) -> Result<Json<CallTranscriptResponse>, QueryApiError> {
    let transcript = state.store.transcript(&call_sid).map_err(map_store_error)?;
    Ok(Json(CallTranscriptResponse {
        call_sid,
        transcript,
    }))
}

/// Response body for `GET /api/calls/{id}/outcome`.
#[derive(Debug, Serialize)]
pub struct CallOutcomeResponse {
    pub call_sid: String,
    pub outcome: CallOutcome,
}

/// Handler for `GET /api/calls/{id}/outcome`.
pub async fn get_outcome_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_sid): Path<String>,
) -> Result<Json<CallOutcomeResponse>, QueryApiError> {
    let outcome = state.store.outcome(&call_sid).map_err(map_store_error)?;
    Ok(Json(CallOutcomeResponse { call_sid, outcome }))
}
