//! Builders for signed Bybit deliveries.
//!
//! A [`DeliveryBuilder`] signs its body with the configured secret unless a
//! signature override is given, so tests only spell out the part of a
//! delivery they want to break.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header::CONTENT_TYPE, Request},
};
use bytes::Bytes;
use bywire_api::server::EVENTS_PATH;
use bywire_core::{crypto, Secret, WebhookRequest, SIGNATURE_HEADER, TIMESTAMP_HEADER};
use serde_json::{json, Value};

/// Secret shared by fixtures and the default test harness.
pub const TEST_SECRET: &str = "s3cr3t";

/// Default delivery timestamp (2023-11-14T22:13:20Z).
pub const TEST_TIMESTAMP_MS: u64 = 1_700_000_000_000;

/// Builder for test deliveries.
#[derive(Debug, Clone)]
pub struct DeliveryBuilder {
    secret: String,
    timestamp: Option<String>,
    signature: Option<String>,
    omit_signature: bool,
    body: Bytes,
    peer: Option<SocketAddr>,
}

impl DeliveryBuilder {
    /// Creates a builder for an `order.filled` event at [`TEST_TIMESTAMP_MS`].
    pub fn new() -> Self {
        Self {
            secret: TEST_SECRET.to_string(),
            timestamp: Some(TEST_TIMESTAMP_MS.to_string()),
            signature: None,
            omit_signature: false,
            body: Bytes::from(order_filled().to_string()),
            peer: None,
        }
    }

    /// Signs with a different secret.
    #[must_use]
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Sets the timestamp header to an epoch-millisecond value.
    #[must_use]
    pub fn timestamp_ms(mut self, ms: u64) -> Self {
        self.timestamp = Some(ms.to_string());
        self
    }

    /// Sets the timestamp header verbatim, even when it is not a number.
    #[must_use]
    pub fn raw_timestamp(mut self, value: impl Into<String>) -> Self {
        self.timestamp = Some(value.into());
        self
    }

    /// Drops the timestamp header.
    #[must_use]
    pub fn without_timestamp(mut self) -> Self {
        self.timestamp = None;
        self
    }

    /// Sends this signature instead of computing one.
    #[must_use]
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Drops the signature header.
    #[must_use]
    pub fn without_signature(mut self) -> Self {
        self.omit_signature = true;
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body in compact form.
    #[must_use]
    pub fn json_body(mut self, value: &Value) -> Self {
        self.body = Bytes::from(value.to_string());
        self
    }

    /// Attaches a peer address as axum connect info.
    #[must_use]
    pub fn peer(mut self, addr: SocketAddr) -> Self {
        self.peer = Some(addr);
        self
    }

    /// Builds the delivery, signing it when no override was given.
    pub fn build(self) -> TestDelivery {
        let signature = if self.omit_signature {
            None
        } else {
            Some(self.signature.unwrap_or_else(|| {
                let secret =
                    Secret::new(self.secret.as_str()).expect("fixture secret is non-empty");
                crypto::sign(&secret, self.timestamp.as_deref().unwrap_or_default(), &self.body)
            }))
        };

        TestDelivery { body: self.body, timestamp: self.timestamp, signature, peer: self.peer }
    }
}

impl Default for DeliveryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A delivery ready to hand to the core or send over HTTP.
#[derive(Debug, Clone)]
pub struct TestDelivery {
    /// Raw request body
    pub body: Bytes,
    /// `X-BYBIT-TIMESTAMP` value, if sent
    pub timestamp: Option<String>,
    /// `X-BYBIT-SIGNATURE` value, if sent
    pub signature: Option<String>,
    /// Peer address attached as connect info
    pub peer: Option<SocketAddr>,
}

impl TestDelivery {
    /// Borrows the delivery as a core request.
    pub fn as_request(&self) -> WebhookRequest<'_> {
        WebhookRequest {
            body: &self.body,
            signature: self.signature.as_deref(),
            timestamp: self.timestamp.as_deref(),
        }
    }

    /// Converts to an HTTP request for the events route.
    pub fn into_http_request(self) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(EVENTS_PATH)
            .header(CONTENT_TYPE, "application/json");

        if let Some(timestamp) = &self.timestamp {
            builder = builder.header(TIMESTAMP_HEADER, timestamp.as_str());
        }
        if let Some(signature) = &self.signature {
            builder = builder.header(SIGNATURE_HEADER, signature.as_str());
        }

        let mut request = builder.body(Body::from(self.body)).expect("valid test request");
        if let Some(peer) = self.peer {
            request.extensions_mut().insert(ConnectInfo(peer));
        }
        request
    }
}

/// The canonical `order.filled` event used across tests.
pub fn order_filled() -> Value {
    json!({
        "type": "order.filled",
        "data": { "orderId": "123", "symbol": "BTCUSDT", "qty": "0.01" }
    })
}
