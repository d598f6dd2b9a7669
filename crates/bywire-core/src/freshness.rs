//! Timestamp freshness gate.
//!
//! The window is inclusive: a timestamp exactly `tolerance` away from now in
//! either direction is accepted, one millisecond further is not.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::RejectReason;

/// Validates a `X-BYBIT-TIMESTAMP` value against `now`.
///
/// The header must be a non-empty run of ASCII digits that fits in a `u64`
/// and is read as epoch milliseconds. Signs, whitespace, and fractions are
/// malformed.
///
/// # Errors
///
/// - [`RejectReason::MalformedTimestamp`] if the value does not parse.
/// - [`RejectReason::StaleOrFutureTimestamp`] if `|now - timestamp|` exceeds
///   `tolerance`.
pub fn check(
    header_timestamp: &str,
    now: SystemTime,
    tolerance: Duration,
) -> Result<u64, RejectReason> {
    let timestamp_ms = parse_timestamp(header_timestamp)?;

    let now_ms = epoch_millis(now);
    let tolerance_ms = u64::try_from(tolerance.as_millis()).unwrap_or(u64::MAX);
    let skew_ms = now_ms.abs_diff(timestamp_ms);

    if skew_ms > tolerance_ms {
        return Err(RejectReason::StaleOrFutureTimestamp { skew_ms });
    }

    Ok(timestamp_ms)
}

fn parse_timestamp(value: &str) -> Result<u64, RejectReason> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RejectReason::MalformedTimestamp);
    }
    value.parse::<u64>().map_err(|_| RejectReason::MalformedTimestamp)
}

/// Milliseconds since the Unix epoch, saturating; times before the epoch
/// read as zero.
pub fn epoch_millis(time: SystemTime) -> u64 {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    u64::try_from(since_epoch.as_millis()).unwrap_or(u64::MAX)
}
