//! Authentication core for Bybit webhook deliveries.
//!
//! Turns a raw request (body bytes plus the `X-BYBIT-SIGNATURE` and
//! `X-BYBIT-TIMESTAMP` header values) into either an authenticated,
//! freshness-checked [`EventEnvelope`] or a typed rejection. Everything here
//! is synchronous, in-memory, and free of shared mutable state, so a single
//! [`Verifier`] can be shared across any number of request tasks.
//!
//! ```text
//! WebhookRequest ──▶ freshness ──▶ signature decode ──▶ sign ──▶ compare
//!                                                                  │
//!                               EventEnvelope ◀── envelope::decode ┘
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod crypto;
pub mod envelope;
pub mod error;
pub mod freshness;
pub mod models;
pub mod time;
pub mod verify;

pub use envelope::{decode, EventEnvelope};
pub use error::{ConfigError, DecodeError, RejectReason, WebhookError};
pub use models::{Secret, VerificationResult, WebhookRequest};
pub use time::{Clock, RealClock, TestClock};
pub use verify::{verify, AuthenticatedEvent, Verifier, DEFAULT_TOLERANCE};

/// Header carrying the hex-encoded HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "X-BYBIT-SIGNATURE";

/// Header carrying the sender's epoch-millisecond timestamp.
pub const TIMESTAMP_HEADER: &str = "X-BYBIT-TIMESTAMP";
