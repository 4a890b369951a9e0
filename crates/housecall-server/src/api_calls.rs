//! Call placement and bridge-event API handlers.
//!
//! Provides:
//! - `POST /api/calls` — place an outbound call and create its record
//! - `POST /api/calls/{id}/status` — telephony lifecycle callback
//! - `POST /api/calls/{id}/transcript` — transcript turn from either bridge
//!
//! The status and transcript endpoints are fed by two independent event
//! streams (the telephony provider's callbacks and the speech bridge's
//! text events); no ordering between them is assumed.

use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use housecall_store::StoreError;
use housecall_types::{AppointmentContext, CallStatus, Speaker};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the call API.
#[derive(Debug, Error)]
pub enum CallApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("call placement failed: {0}")]
    DialFailed(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for CallApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            CallApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            CallApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            CallApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            CallApiError::DialFailed(msg) => (StatusCode::BAD_GATEWAY, msg),
            CallApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

fn map_store_error(e: StoreError) -> CallApiError {
    match e {
        StoreError::NotFound(_) => CallApiError::NotFound(e.to_string()),
        StoreError::DuplicateId(_) => CallApiError::Conflict(e.to_string()),
        StoreError::Persistence(_) => CallApiError::Internal(e.to_string()),
    }
}

/// Request body for `POST /api/calls`.
#[derive(Debug, Deserialize)]
pub struct PlaceCallRequest {
    /// The patient's phone number.
    pub to_number: String,
    /// Appointment details for the conversation.
    #[serde(default)]
    pub appointment: AppointmentContext,
}

/// Response body for `POST /api/calls`.
#[derive(Debug, Serialize)]
pub struct PlaceCallResponse {
    /// Provider-assigned call SID; the key for all later queries.
    pub call_sid: String,
}

/// Handler for `POST /api/calls`.
///
/// Dials the patient through the telephony provider, then creates the
/// call record under the SID the provider assigned.
pub async fn place_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<PlaceCallRequest>,
) -> Result<Json<PlaceCallResponse>, CallApiError> {
    if body.to_number.trim().is_empty() {
        return Err(CallApiError::BadRequest(
            "missing required parameter: to_number".to_string(),
        ));
    }

    let call_sid = state
        .dialer
        .place_call(&body.to_number)
        .await
        .map_err(|e| {
            tracing::error!(to_number = %body.to_number, "call placement failed: {}", e);
            CallApiError::DialFailed(e.to_string())
        })?;

    state
        .store
        .create_record(&call_sid, &body.to_number, body.appointment)
        .map_err(map_store_error)?;

    Ok(Json(PlaceCallResponse { call_sid }))
}

/// Request body for `POST /api/calls/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusCallbackRequest {
    /// Provider status label (e.g. `ringing`, `in-progress`, `completed`).
    pub status: String,
}

/// Handler for `POST /api/calls/{id}/status`.
///
/// Applies a telephony lifecycle callback. Returns `204 No Content` on
/// success; unknown labels are a client error, unknown ids are 404.
pub async fn status_callback_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_sid): Path<String>,
    Json(body): Json<StatusCallbackRequest>,
) -> Result<StatusCode, CallApiError> {
    let status: CallStatus = body.status.parse().map_err(|_| {
        CallApiError::BadRequest(format!(
            "invalid status: {}. Expected one of: queued, ringing, in-progress, completed, failed, no-answer, busy",
            body.status
        ))
    })?;

    state
        .store
        .update_status(&call_sid, status)
        .map_err(map_store_error)?;

    Ok(StatusCode::NO_CONTENT)
}

/// Request body for `POST /api/calls/{id}/transcript`.
#[derive(Debug, Deserialize)]
pub struct TranscriptEventRequest {
    /// Which side of the conversation spoke.
    pub speaker: Speaker,
    /// The transcribed text; may be empty for an untranscribed turn.
    #[serde(default)]
    pub text: String,
}

/// Response body for `POST /api/calls/{id}/transcript`.
#[derive(Debug, Serialize)]
pub struct TranscriptEventResponse {
    /// Sequence assigned to the entry, or `null` when the record was
    /// already finalized and the entry was dropped.
    pub sequence: Option<u64>,
    /// Whether the record is frozen.
    pub frozen: bool,
}

/// Handler for `POST /api/calls/{id}/transcript`.
///
/// Appends one conversation turn from either bridge. Late events against
/// a finalized record are acknowledged, not errors — the response just
/// reports that the record is frozen.
pub async fn transcript_event_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_sid): Path<String>,
    Json(body): Json<TranscriptEventRequest>,
) -> Result<Json<TranscriptEventResponse>, CallApiError> {
    let sequence = state
        .store
        .append_transcript_entry(&call_sid, body.speaker, &body.text)
        .map_err(map_store_error)?;

    Ok(Json(TranscriptEventResponse {
        frozen: sequence.is_none(),
        sequence,
    }))
}
