//! Integration tests for the events endpoint.
//!
//! Drives signed and tampered deliveries through the full router and checks
//! status codes, error bodies, and what reaches the event sink.

use std::time::Duration;

use axum::http::StatusCode;
use bywire_api::RouterConfig;
use bywire_testing::{order_filled, DeliveryBuilder, TestApp, TEST_TIMESTAMP_MS};
use serde_json::json;

/// A correctly signed, fresh delivery is accepted, echoed, and published.
#[tokio::test]
async fn valid_delivery_is_accepted_and_published() {
    let mut app = TestApp::new().expect("test app");

    let response = app.deliver(DeliveryBuilder::new().build()).await.expect("request");

    assert_eq!(response.status, StatusCode::OK);
    let body = response.json().expect("json body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["event"], order_filled());

    let event = app.try_next_event().expect("event should be published");
    assert_eq!(event.timestamp_ms, TEST_TIMESTAMP_MS);
    assert_eq!(event.envelope.event_type, "order.filled");
    assert_eq!(event.envelope.data["orderId"], "123");
    assert_eq!(
        response.headers.get("x-request-id").and_then(|v| v.to_str().ok()),
        Some(event.request_id.as_str())
    );
    assert!(app.try_next_event().is_none());
}

/// Uppercase hex signatures verify the same as lowercase ones.
#[tokio::test]
async fn uppercase_signature_is_accepted() {
    let app = TestApp::new().expect("test app");
    let delivery = DeliveryBuilder::new().build();
    let upper = delivery.signature.clone().expect("signed").to_uppercase();

    let response =
        app.deliver(DeliveryBuilder::new().signature(upper).build()).await.expect("request");

    assert_eq!(response.status, StatusCode::OK);
}

/// Missing and malformed headers are client errors with distinct codes.
#[tokio::test]
async fn header_problems_return_bad_request() {
    let app = TestApp::new().expect("test app");

    let cases = [
        (DeliveryBuilder::new().without_timestamp(), "E1001"),
        (DeliveryBuilder::new().raw_timestamp("17e11"), "E1002"),
        (DeliveryBuilder::new().raw_timestamp("+1700000000000"), "E1002"),
        (DeliveryBuilder::new().without_signature(), "E1004"),
        (DeliveryBuilder::new().signature("zz"), "E1005"),
        (DeliveryBuilder::new().signature(""), "E1005"),
    ];

    for (builder, code) in cases {
        let response = app.deliver(builder.build()).await.expect("request");

        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{code}");
        assert_eq!(response.error_code().as_deref(), Some(code));
    }
}

/// Missing timestamp is reported even when the signature is also missing.
#[tokio::test]
async fn freshness_is_checked_before_signature() {
    let app = TestApp::new().expect("test app");

    let response = app
        .deliver(DeliveryBuilder::new().without_timestamp().without_signature().build())
        .await
        .expect("request");

    assert_eq!(response.error_code().as_deref(), Some("E1001"));

    let stale = DeliveryBuilder::new().timestamp_ms(TEST_TIMESTAMP_MS - 3_600_000).signature("zz");
    let response = app.deliver(stale.build()).await.expect("request");

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code().as_deref(), Some("E1003"));
}

/// Signatures computed with another secret or over another body fail.
#[tokio::test]
async fn tampered_deliveries_are_unauthorized() {
    let mut app = TestApp::new().expect("test app");

    let wrong_secret = DeliveryBuilder::new().secret("other").build();
    let response = app.deliver(wrong_secret).await.expect("request");
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code().as_deref(), Some("E1006"));

    let mut tampered = DeliveryBuilder::new().build();
    tampered.body = tampered.body.slice(..tampered.body.len() - 1);
    let response = app.deliver(tampered).await.expect("request");
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let zeros = DeliveryBuilder::new().signature("0".repeat(64)).build();
    let response = app.deliver(zeros).await.expect("request");
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    assert!(app.try_next_event().is_none(), "rejected deliveries must not be published");
}

/// The freshness window is inclusive at exactly the tolerance.
#[tokio::test]
async fn freshness_window_boundaries() {
    let app = TestApp::new().expect("test app");

    app.clock.advance(Duration::from_secs(300));
    let response = app.deliver(DeliveryBuilder::new().build()).await.expect("request");
    assert_eq!(response.status, StatusCode::OK);

    app.clock.advance(Duration::from_millis(1));
    let response = app.deliver(DeliveryBuilder::new().build()).await.expect("request");
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error_code().as_deref(), Some("E1003"));

    let message = response.json().expect("json body")["error"]["message"].clone();
    assert_eq!(message, "Timestamp outside freshness window");
}

/// A replay of a captured delivery fails once it ages out of the window.
#[tokio::test]
async fn replay_after_window_is_rejected() {
    let app = TestApp::new().expect("test app");
    let captured = DeliveryBuilder::new().build();

    let first = app.deliver(captured.clone()).await.expect("request");
    assert_eq!(first.status, StatusCode::OK);

    app.clock.advance(Duration::from_secs(301));
    let replay = app.deliver(captured).await.expect("request");
    assert_eq!(replay.status, StatusCode::UNAUTHORIZED);
}

/// Timestamps from the future are held to the same window.
#[tokio::test]
async fn future_timestamp_is_rejected() {
    let app = TestApp::new().expect("test app");

    let response = app
        .deliver(DeliveryBuilder::new().timestamp_ms(TEST_TIMESTAMP_MS + 300_001).build())
        .await
        .expect("request");

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

/// Authentic bodies that are not envelopes are rejected after verification.
#[tokio::test]
async fn authentic_non_envelope_is_bad_request() {
    let mut app = TestApp::new().expect("test app");

    let missing_type = DeliveryBuilder::new().json_body(&json!({ "data": {} })).build();
    let response = app.deliver(missing_type).await.expect("request");
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code().as_deref(), Some("E1102"));

    let not_json = DeliveryBuilder::new().body("not json").build();
    let response = app.deliver(not_json).await.expect("request");
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code().as_deref(), Some("E1101"));
    let body = response.json().expect("json body");
    insta::assert_snapshot!(body["error"]["message"].as_str().unwrap_or_default(), @"Malformed JSON payload");

    assert!(app.try_next_event().is_none());
}

/// An authentic envelope without `data` is still malformed.
#[tokio::test]
async fn envelope_without_data_is_bad_request() {
    let app = TestApp::new().expect("test app");

    let response = app
        .deliver(DeliveryBuilder::new().json_body(&json!({ "type": "ping" })).build())
        .await
        .expect("request");

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error_code().as_deref(), Some("E1101"));
}

/// Sink failures surface as 502 so the sender retries.
#[tokio::test]
async fn publish_failure_returns_bad_gateway() {
    let mut app = TestApp::new().expect("test app");
    app.close_sink();

    let response = app.deliver(DeliveryBuilder::new().build()).await.expect("request");

    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(response.error_code().as_deref(), Some("E2002"));
}

/// A full channel also fails the request rather than blocking.
#[tokio::test]
async fn full_channel_returns_bad_gateway() {
    let mut app = TestApp::builder().channel_capacity(1).build().expect("test app");

    let first = app.deliver(DeliveryBuilder::new().build()).await.expect("request");
    assert_eq!(first.status, StatusCode::OK);

    let second = app.deliver(DeliveryBuilder::new().build()).await.expect("request");
    assert_eq!(second.status, StatusCode::BAD_GATEWAY);
    assert_eq!(second.error_code().as_deref(), Some("E2001"));

    assert!(app.try_next_event().is_some());
}

/// Bodies over the configured limit are refused before verification.
#[tokio::test]
async fn oversized_body_is_rejected() {
    let config = RouterConfig { max_body_bytes: 64, ..RouterConfig::default() };
    let app = TestApp::builder().router_config(config).build().expect("test app");

    let body = json!({ "type": "order.filled", "data": { "note": "x".repeat(128) } });
    let response =
        app.deliver(DeliveryBuilder::new().json_body(&body).build()).await.expect("request");

    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.error_code().as_deref(), Some("E1201"));
    let message = response.json().expect("json body")["error"]["message"].clone();
    assert_eq!(message, "Payload too large");
}

/// Only POST is routed to the events endpoint.
#[tokio::test]
async fn get_on_events_route_is_not_allowed() {
    let app = TestApp::new().expect("test app");

    let response = app.get("/bybit/events").await.expect("request");

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
}

/// The core pipeline and the HTTP route agree on the same delivery.
#[tokio::test]
async fn core_and_route_agree() {
    let app = TestApp::new().expect("test app");
    let verifier = bywire_core::Verifier::with_default_tolerance(
        bywire_core::Secret::new(bywire_testing::TEST_SECRET).expect("secret"),
    );
    let now = std::time::UNIX_EPOCH + Duration::from_millis(TEST_TIMESTAMP_MS);

    for delivery in [
        DeliveryBuilder::new().build(),
        DeliveryBuilder::new().secret("other").build(),
        DeliveryBuilder::new().raw_timestamp("abc").build(),
    ] {
        let verified = verifier.verify(&delivery.as_request(), now).is_verified();
        let response = app.deliver(delivery).await.expect("request");

        assert_eq!(verified, response.status == StatusCode::OK);
    }
}
