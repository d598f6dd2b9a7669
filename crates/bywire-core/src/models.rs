//! Request, secret, and verification outcome types.

use std::fmt;

use crate::error::{ConfigError, RejectReason};

/// Borrowed view of an inbound delivery.
///
/// Header values are `None` when the header was absent; that case is a
/// distinct rejection rather than an empty string handled downstream.
#[derive(Debug, Clone, Copy)]
pub struct WebhookRequest<'a> {
    /// Body bytes exactly as received on the wire.
    pub body: &'a [u8],
    /// Raw `X-BYBIT-SIGNATURE` value.
    pub signature: Option<&'a str>,
    /// Raw `X-BYBIT-TIMESTAMP` value.
    pub timestamp: Option<&'a str>,
}

impl<'a> WebhookRequest<'a> {
    /// Creates a request with both headers present.
    pub fn new(body: &'a [u8], signature: &'a str, timestamp: &'a str) -> Self {
        Self { body, signature: Some(signature), timestamp: Some(timestamp) }
    }
}

/// Shared HMAC key for webhook signatures.
///
/// Loaded once at startup and never mutated. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    /// Wraps a secret value, refusing empty input.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSecret`] if `value` is empty.
    pub fn new(value: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(Self(value))
    }

    /// Returns the raw key bytes.
    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Outcome of running the verification pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// Signature matched and timestamp is fresh.
    Verified {
        /// Parsed sender timestamp in epoch milliseconds.
        canonical_timestamp: u64,
    },
    /// Delivery must not be trusted.
    Rejected {
        /// First check that failed.
        reason: RejectReason,
    },
}

impl VerificationResult {
    /// Returns true for [`VerificationResult::Verified`].
    pub const fn is_verified(&self) -> bool {
        matches!(self, Self::Verified { .. })
    }

    /// Converts into a `Result` carrying the canonical timestamp.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason if verification failed.
    pub fn into_result(self) -> Result<u64, RejectReason> {
        match self {
            Self::Verified { canonical_timestamp } => Ok(canonical_timestamp),
            Self::Rejected { reason } => Err(reason),
        }
    }
}

impl From<Result<u64, RejectReason>> for VerificationResult {
    fn from(result: Result<u64, RejectReason>) -> Self {
        match result {
            Ok(canonical_timestamp) => Self::Verified { canonical_timestamp },
            Err(reason) => Self::Rejected { reason },
        }
    }
}
