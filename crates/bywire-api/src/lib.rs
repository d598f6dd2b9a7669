//! HTTP surface for the Bybit webhook receiver.
//!
//! Wires the verification core into an axum router: the events endpoint,
//! health probes, the peer allowlist, and the publishing seam that hands
//! verified events to downstream consumers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use bywire_core::{Clock, RealClock, Verifier};

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod publish;
pub mod server;

pub use config::Config;
pub use middleware::allowlist::IpAllowlist;
pub use publish::{ChannelSink, EventSink, LogSink, PublishError, VerifiedEvent};
pub use server::{create_router, serve, start_server, RequestId, RouterConfig};

/// Shared state handed to every handler.
///
/// Every field is immutable after startup; clones share the same `Arc`s.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Signature and freshness verification.
    pub verifier: Arc<Verifier>,
    /// Time source for freshness checks and response timestamps.
    pub clock: Arc<dyn Clock>,
    /// Destination for verified events.
    pub sink: Arc<dyn EventSink>,
    /// Peers permitted to deliver events.
    pub allowlist: Arc<IpAllowlist>,
}

impl AppState {
    /// Creates state with the real clock, a logging sink, and no allowlist.
    pub fn new(verifier: Verifier) -> Self {
        Self {
            verifier: Arc::new(verifier),
            clock: Arc::new(RealClock::new()),
            sink: Arc::new(LogSink::default()),
            allowlist: Arc::new(IpAllowlist::allow_all()),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the allowlist.
    #[must_use]
    pub fn with_allowlist(mut self, allowlist: IpAllowlist) -> Self {
        self.allowlist = Arc::new(allowlist);
        self
    }
}
