//! Hand-off of verified events to downstream consumers.
//!
//! The receiver never interprets or stores events. Once a delivery passes
//! verification and decoding it is handed to an [`EventSink`]; what happens
//! next (broker, queue, business logic) belongs to the sink.
//!
//! ```text
//! ┌──────────────────┐   VerifiedEvent   ┌──────────────┐
//! │ POST /bybit/     │ ─────────────────▶│  EventSink   │──▶ log / channel
//! │ events handler   │                   └──────────────┘
//! └──────────────────┘
//! ```

use bywire_core::EventEnvelope;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::info;

/// Default queue name reported by [`LogSink`].
pub const DEFAULT_QUEUE: &str = "bybit-events";

/// Event that passed verification and decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedEvent {
    /// Request ID assigned by the server middleware.
    pub request_id: String,
    /// Sender timestamp in epoch milliseconds.
    pub timestamp_ms: u64,
    /// When the receiver accepted the delivery.
    pub received_at: DateTime<Utc>,
    /// Decoded envelope.
    pub envelope: EventEnvelope,
}

/// Failure to hand an event to its sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// Bounded channel has no free capacity (E2001).
    #[error("[E2001] Event channel is full")]
    ChannelFull,

    /// Consumer side of the channel has been dropped (E2002).
    #[error("[E2002] Event channel is closed")]
    ChannelClosed,
}

impl PublishError {
    /// Returns the stable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ChannelFull => "E2001",
            Self::ChannelClosed => "E2002",
        }
    }
}

/// Destination for verified events.
#[async_trait::async_trait]
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Publishes one event.
    ///
    /// An error makes the handler answer 502 so the sender retries.
    async fn publish(&self, event: VerifiedEvent) -> Result<(), PublishError>;

    /// Whether the sink can currently accept events.
    fn is_healthy(&self) -> bool {
        true
    }
}

/// Sink that records each event as a structured log line.
#[derive(Debug, Clone)]
pub struct LogSink {
    queue: String,
}

impl LogSink {
    /// Creates a logging sink reporting under `queue`.
    pub fn new(queue: impl Into<String>) -> Self {
        Self { queue: queue.into() }
    }

    /// Queue name attached to each log line.
    pub fn queue(&self) -> &str {
        &self.queue
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE)
    }
}

#[async_trait::async_trait]
impl EventSink for LogSink {
    async fn publish(&self, event: VerifiedEvent) -> Result<(), PublishError> {
        info!(
            queue = %self.queue,
            request_id = %event.request_id,
            event_type = %event.envelope.event_type,
            timestamp_ms = event.timestamp_ms,
            "Event published"
        );
        Ok(())
    }
}

/// Sink forwarding events over a bounded tokio channel.
///
/// Publishing never waits: a full channel fails the request so backpressure
/// reaches the sender instead of piling up in memory.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<VerifiedEvent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver its consumer reads from.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<VerifiedEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait::async_trait]
impl EventSink for ChannelSink {
    async fn publish(&self, event: VerifiedEvent) -> Result<(), PublishError> {
        self.sender.try_send(event).map_err(|e| match e {
            TrySendError::Full(_) => PublishError::ChannelFull,
            TrySendError::Closed(_) => PublishError::ChannelClosed,
        })
    }

    fn is_healthy(&self) -> bool {
        !self.sender.is_closed()
    }
}
