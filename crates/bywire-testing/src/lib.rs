//! Test infrastructure for the Bybit webhook receiver.
//!
//! Provides signed delivery builders and an in-process application harness
//! with a controllable clock and a channel-backed event sink, so HTTP tests
//! run without sockets or wall-clock time.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bywire_api::{create_router, AppState, ChannelSink, IpAllowlist, RouterConfig, VerifiedEvent};
use bywire_core::{Secret, Verifier};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

pub mod fixtures;

pub use bywire_core::TestClock;
pub use fixtures::{order_filled, DeliveryBuilder, TestDelivery, TEST_SECRET, TEST_TIMESTAMP_MS};

/// Response captured from the in-process router.
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status
    pub status: StatusCode,
    /// Response headers
    pub headers: axum::http::HeaderMap,
    /// Raw response body
    pub body: bytes::Bytes,
}

impl TestResponse {
    /// Parses the body as JSON.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_slice(&self.body).context("response body is not JSON")
    }

    /// Error code from an `{"error": {"code": ..}}` body.
    pub fn error_code(&self) -> Option<String> {
        self.json().ok()?["error"]["code"].as_str().map(str::to_string)
    }
}

/// Builder for [`TestApp`].
#[derive(Debug)]
pub struct TestAppBuilder {
    secret: String,
    tolerance: Duration,
    start_ms: u64,
    allowlist: IpAllowlist,
    router: RouterConfig,
    channel_capacity: usize,
}

impl TestAppBuilder {
    /// Uses a different secret.
    #[must_use]
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Uses a different freshness window.
    #[must_use]
    pub fn tolerance(mut self, tolerance: Duration) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Starts the clock at this epoch-millisecond value.
    #[must_use]
    pub fn start_ms(mut self, ms: u64) -> Self {
        self.start_ms = ms;
        self
    }

    /// Restricts the events route to these peers.
    #[must_use]
    pub fn allowlist(mut self, allowlist: IpAllowlist) -> Self {
        self.allowlist = allowlist;
        self
    }

    /// Overrides router limits.
    #[must_use]
    pub fn router_config(mut self, config: RouterConfig) -> Self {
        self.router = config;
        self
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Builds the application.
    pub fn build(self) -> Result<TestApp> {
        let secret = Secret::new(self.secret)?;
        let verifier = Verifier::new(secret, self.tolerance)?;
        let clock = TestClock::at_millis(self.start_ms);
        let (sink, events) = ChannelSink::new(self.channel_capacity);

        let state = AppState::new(verifier)
            .with_clock(Arc::new(clock.clone()))
            .with_sink(Arc::new(sink))
            .with_allowlist(self.allowlist);

        Ok(TestApp { router: create_router(state, self.router), clock, events })
    }
}

/// In-process receiver wired to a [`TestClock`] and a channel sink.
pub struct TestApp {
    router: Router,
    /// Clock driving freshness checks
    pub clock: TestClock,
    events: mpsc::Receiver<VerifiedEvent>,
}

impl TestApp {
    /// Builder with the fixture secret, default tolerance, and the clock at
    /// [`TEST_TIMESTAMP_MS`].
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            secret: TEST_SECRET.to_string(),
            tolerance: bywire_core::DEFAULT_TOLERANCE,
            start_ms: TEST_TIMESTAMP_MS,
            allowlist: IpAllowlist::allow_all(),
            router: RouterConfig::default(),
            channel_capacity: 16,
        }
    }

    /// Application with default settings.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Sends an arbitrary request through the router.
    pub async fn send(&self, request: Request<Body>) -> Result<TestResponse> {
        let response = self.router.clone().oneshot(request).await.context("request execution")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("body extraction")?;

        Ok(TestResponse { status, headers, body })
    }

    /// Posts a delivery to the events route.
    pub async fn deliver(&self, delivery: TestDelivery) -> Result<TestResponse> {
        self.send(delivery.into_http_request()).await
    }

    /// Issues a GET request.
    pub async fn get(&self, path: &str) -> Result<TestResponse> {
        let request = Request::builder().uri(path).body(Body::empty())?;
        self.send(request).await
    }

    /// Next event the sink received, if one is queued.
    pub fn try_next_event(&mut self) -> Option<VerifiedEvent> {
        self.events.try_recv().ok()
    }

    /// Closes the sink so further publishes fail.
    pub fn close_sink(&mut self) {
        self.events.close();
    }
}
