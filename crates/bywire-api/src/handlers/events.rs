//! Bybit event ingestion handler.
//!
//! Reads the raw body and the two signature headers, runs the verification
//! pipeline, decodes only after it passes, and publishes the result.

use axum::{
    extract::{rejection::BytesRejection, State},
    http::{HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use bywire_core::{
    AuthenticatedEvent, DecodeError, EventEnvelope, RejectReason, WebhookError, WebhookRequest,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{publish::VerifiedEvent, server::RequestId, AppState};

static SIGNATURE_HEADER: HeaderName = HeaderName::from_static("x-bybit-signature");
static TIMESTAMP_HEADER: HeaderName = HeaderName::from_static("x-bybit-timestamp");

/// Successful ingestion response.
#[derive(Debug, Serialize)]
pub struct EventAccepted {
    /// Always `"ok"`.
    pub status: &'static str,
    /// Decoded envelope.
    pub event: EventEnvelope,
}

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Stable error code
    pub code: String,
    /// Generic, non-revealing description
    pub message: String,
}

/// Body larger than the configured limit (E1201).
pub const PAYLOAD_TOO_LARGE_CODE: &str = "E1201";

/// Body that could not be read for any other reason (E1202).
pub const UNREADABLE_BODY_CODE: &str = "E1202";

/// Receives a signed Bybit event.
///
/// # Errors
///
/// Returns:
/// - 400: missing or malformed headers, or a body that is not an envelope
/// - 401: stale/future timestamp or signature mismatch
/// - 413: body over the configured limit
/// - 502: the event sink refused the event
#[instrument(
    name = "receive_event",
    skip_all,
    fields(
        request_id = %request_id.0,
        body_len = body.as_ref().map_or(0, Bytes::len),
        timestamp = headers.get(&TIMESTAMP_HEADER).and_then(|v| v.to_str().ok()).unwrap_or("none"),
    )
)]
pub async fn receive_event(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => return body_rejection_response(&rejection),
    };

    let request = WebhookRequest {
        body: &body,
        signature: header_value(&headers, &SIGNATURE_HEADER),
        timestamp: header_value(&headers, &TIMESTAMP_HEADER),
    };

    let now = state.clock.now_system();
    let AuthenticatedEvent { timestamp_ms, envelope } =
        match state.verifier.authenticate(&request, now) {
            Ok(event) => event,
            Err(e) => {
                warn!(code = e.code(), "Rejected Bybit delivery");
                return create_error_response(status_for(&e), e.code(), &public_message(&e));
            },
        };

    info!(event_type = %envelope.event_type, timestamp_ms, "Bybit delivery verified");

    let event = VerifiedEvent {
        request_id: request_id.0,
        timestamp_ms,
        received_at: DateTime::<Utc>::from(now),
        envelope: envelope.clone(),
    };

    if let Err(e) = state.sink.publish(event).await {
        error!(code = e.code(), error = %e, "Failed to publish event");
        return create_error_response(StatusCode::BAD_GATEWAY, e.code(), "Failed to publish event");
    }

    (StatusCode::OK, Json(EventAccepted { status: "ok", event: envelope })).into_response()
}

/// Returns the header value, `Some("")` for values that are not visible
/// ASCII so they fail as malformed rather than missing.
fn header_value<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).map(|value| value.to_str().unwrap_or_default())
}

/// Maps a failure to its HTTP status.
pub fn status_for(err: &WebhookError) -> StatusCode {
    match err {
        WebhookError::Rejected(reason) if reason.is_authentication_failure() => {
            StatusCode::UNAUTHORIZED
        },
        WebhookError::Rejected(_) | WebhookError::Decode(_) => StatusCode::BAD_REQUEST,
    }
}

/// Message safe to return to the caller; parser details stay in the logs.
fn public_message(err: &WebhookError) -> String {
    match err {
        WebhookError::Decode(DecodeError::MalformedJson { .. }) => {
            "Malformed JSON payload".to_string()
        },
        WebhookError::Rejected(RejectReason::StaleOrFutureTimestamp { .. }) => {
            "Timestamp outside freshness window".to_string()
        },
        WebhookError::Rejected(reason) => strip_code(&reason.to_string()),
        WebhookError::Decode(err) => strip_code(&err.to_string()),
    }
}

fn strip_code(message: &str) -> String {
    message.split_once("] ").map_or(message, |(_, rest)| rest).to_string()
}

/// Maps a body extraction failure to the shared error shape without
/// exposing axum's rejection text.
fn body_rejection_response(rejection: &BytesRejection) -> Response {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(code = PAYLOAD_TOO_LARGE_CODE, "Rejected oversized Bybit delivery");
        return create_error_response(
            StatusCode::PAYLOAD_TOO_LARGE,
            PAYLOAD_TOO_LARGE_CODE,
            "Payload too large",
        );
    }

    warn!(code = UNREADABLE_BODY_CODE, error = %rejection, "Failed to read request body");
    create_error_response(StatusCode::BAD_REQUEST, UNREADABLE_BODY_CODE, "Unreadable request body")
}

/// Creates a standardized error response.
pub(crate) fn create_error_response(status: StatusCode, code: &str, message: &str) -> Response {
    let error_response = ErrorResponse {
        error: ErrorDetail { code: code.to_string(), message: message.to_string() },
    };

    (status, Json(error_response)).into_response()
}
