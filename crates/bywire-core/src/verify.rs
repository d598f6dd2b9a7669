//! Verification pipeline.
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. timestamp present and fresh
//! 2. signature present and hex
//! 3. expected MAC over `timestamp ++ body`
//! 4. constant-time comparison
//!
//! The body is never parsed before all four pass.

use std::time::{Duration, SystemTime};

use tracing::debug;

use crate::{
    crypto,
    envelope::{self, EventEnvelope},
    error::{ConfigError, RejectReason, WebhookError},
    freshness,
    models::{Secret, VerificationResult, WebhookRequest},
};

/// Default freshness window.
pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(5 * 60);

/// Runs the full verification pipeline on one request.
///
/// Pure and stateless; safe to call concurrently with a shared `secret`.
///
/// # Example
///
/// ```
/// use std::time::{Duration, UNIX_EPOCH};
///
/// use bywire_core::{crypto::sign, verify, Secret, VerificationResult, WebhookRequest};
///
/// let secret = Secret::new("s3cr3t").unwrap();
/// let body = br#"{"type":"order.filled","data":{"order_id":"1"}}"#;
/// let timestamp = "1700000000000";
/// let signature = sign(&secret, timestamp, body);
///
/// let now = UNIX_EPOCH + Duration::from_millis(1_700_000_001_000);
/// let request = WebhookRequest::new(body, &signature, timestamp);
/// let result = verify(&request, &secret, now, Duration::from_secs(300));
///
/// assert_eq!(result, VerificationResult::Verified { canonical_timestamp: 1_700_000_000_000 });
/// ```
pub fn verify(
    request: &WebhookRequest<'_>,
    secret: &Secret,
    now: SystemTime,
    tolerance: Duration,
) -> VerificationResult {
    run_checks(request, secret, now, tolerance).into()
}

fn run_checks(
    request: &WebhookRequest<'_>,
    secret: &Secret,
    now: SystemTime,
    tolerance: Duration,
) -> Result<u64, RejectReason> {
    let timestamp = request.timestamp.ok_or(RejectReason::MissingTimestamp)?;
    let canonical_timestamp = freshness::check(timestamp, now, tolerance)?;

    let signature = request.signature.ok_or(RejectReason::MissingSignature)?;
    let provided = crypto::decode_signature(signature)?;

    let expected = crypto::sign_bytes(secret, timestamp, request.body);

    if !crypto::equal(&expected, &provided) {
        return Err(RejectReason::SignatureMismatch);
    }

    Ok(canonical_timestamp)
}

/// A delivery that passed verification and decoded into an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedEvent {
    /// Sender timestamp in epoch milliseconds.
    pub timestamp_ms: u64,
    /// Decoded envelope.
    pub envelope: EventEnvelope,
}

/// Verification pipeline bound to one secret and tolerance.
///
/// Holds no mutable state; share it behind an `Arc` across request tasks.
#[derive(Debug, Clone)]
pub struct Verifier {
    secret: Secret,
    tolerance: Duration,
}

impl Verifier {
    /// Creates a verifier.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTolerance`] for a zero-length window.
    pub fn new(secret: Secret, tolerance: Duration) -> Result<Self, ConfigError> {
        if tolerance.is_zero() {
            return Err(ConfigError::ZeroTolerance);
        }
        Ok(Self { secret, tolerance })
    }

    /// Creates a verifier with [`DEFAULT_TOLERANCE`].
    pub fn with_default_tolerance(secret: Secret) -> Self {
        Self { secret, tolerance: DEFAULT_TOLERANCE }
    }

    /// Configured freshness window.
    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Verifies signature and freshness of `request` at time `now`.
    pub fn verify(&self, request: &WebhookRequest<'_>, now: SystemTime) -> VerificationResult {
        let result = verify(request, &self.secret, now, self.tolerance);
        if let VerificationResult::Rejected { reason } = &result {
            debug!(code = reason.code(), reason = %reason, "Webhook verification rejected");
        }
        result
    }

    /// Verifies `request` and, only on success, decodes its body.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookError::Rejected`] if verification fails (the body is
    /// left unparsed) or [`WebhookError::Decode`] if the verified body is not
    /// a valid envelope.
    pub fn authenticate(
        &self,
        request: &WebhookRequest<'_>,
        now: SystemTime,
    ) -> Result<AuthenticatedEvent, WebhookError> {
        let timestamp_ms = self.verify(request, now).into_result()?;
        let envelope = envelope::decode(request.body)?;
        Ok(AuthenticatedEvent { timestamp_ms, envelope })
    }
}
