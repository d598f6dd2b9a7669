//! HTTP request handlers.
//!
//! - `events` - signed Bybit event ingestion
//! - `health` - health and liveness probes
//!
//! Error responses share one shape, `{"error":{"code":..,"message":..}}`,
//! with generic messages that never echo signature material.

pub mod events;
pub mod health;

pub use events::receive_event;
pub use health::{health_check, liveness_check};
