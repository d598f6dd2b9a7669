//! Rejection and decoding error taxonomy.
//!
//! Every way an inbound delivery can fail maps to exactly one variant with a
//! stable code, so the HTTP layer can choose a status without inspecting
//! message text. Messages are deliberately generic: none of them carries
//! signature material or the expected MAC.

use thiserror::Error;

/// Why a delivery failed authentication or freshness checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// `X-BYBIT-TIMESTAMP` header absent (E1001).
    #[error("[E1001] Missing timestamp header")]
    MissingTimestamp,

    /// Timestamp is not a non-negative decimal integer (E1002).
    #[error("[E1002] Malformed timestamp header")]
    MalformedTimestamp,

    /// Timestamp lies outside the freshness window (E1003).
    #[error("[E1003] Timestamp outside freshness window")]
    StaleOrFutureTimestamp {
        /// Absolute distance between the claimed send time and now, in
        /// milliseconds.
        skew_ms: u64,
    },

    /// `X-BYBIT-SIGNATURE` header absent (E1004).
    #[error("[E1004] Missing signature header")]
    MissingSignature,

    /// Signature is empty, not hex, or of odd length (E1005).
    #[error("[E1005] Malformed signature header")]
    MalformedSignature,

    /// Signature does not match the expected MAC (E1006).
    #[error("[E1006] Signature mismatch")]
    SignatureMismatch,
}

impl RejectReason {
    /// Returns the stable error code for this rejection.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingTimestamp => "E1001",
            Self::MalformedTimestamp => "E1002",
            Self::StaleOrFutureTimestamp { .. } => "E1003",
            Self::MissingSignature => "E1004",
            Self::MalformedSignature => "E1005",
            Self::SignatureMismatch => "E1006",
        }
    }

    /// True when the request was well-formed but failed authentication,
    /// as opposed to being structurally invalid.
    pub const fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::StaleOrFutureTimestamp { .. } | Self::SignatureMismatch)
    }
}

/// Why a verified body could not be decoded into an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Body is not a JSON object with an object-valued `data` field (E1101).
    #[error("[E1101] Malformed JSON payload: {detail}")]
    MalformedJson {
        /// Parser or shape detail.
        detail: String,
    },

    /// `type` field absent or not a string (E1102).
    #[error("[E1102] Missing event type")]
    MissingType,
}

impl DecodeError {
    /// Returns the stable error code for this decoding failure.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MalformedJson { .. } => "E1101",
            Self::MissingType => "E1102",
        }
    }

    pub(crate) fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedJson { detail: detail.into() }
    }
}

/// Failure of the full authenticate-then-decode flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Verification rejected the delivery; the body was never parsed.
    #[error(transparent)]
    Rejected(#[from] RejectReason),

    /// Verification passed but the body is not a valid envelope.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl WebhookError {
    /// Returns the stable error code of the underlying failure.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Rejected(reason) => reason.code(),
            Self::Decode(err) => err.code(),
        }
    }
}

/// Configuration problems that must stop the process before serving.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Webhook secret absent or empty (E3001).
    #[error("[E3001] Webhook secret is not configured")]
    MissingSecret,

    /// Freshness tolerance of zero would reject every delivery (E3002).
    #[error("[E3002] Timestamp tolerance must be greater than zero")]
    ZeroTolerance,
}
