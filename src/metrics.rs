//! Metric helpers for `pocketio`.
//!
//! This module defines metric names and thin wrappers around the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking open WebSocket connections.
pub const CONNECTIONS_ACTIVE: &str = "pocketio_connections_active";
/// Name of the counter tracking frames read and written.
pub const FRAMES_PROCESSED: &str = "pocketio_frames_processed_total";
/// Name of the counter tracking heartbeat pings sent.
pub const HEARTBEATS_TOTAL: &str = "pocketio_heartbeats_total";
/// Name of the counter tracking failed engine operations.
pub const ERRORS_TOTAL: &str = "pocketio_errors_total";

/// Direction of frame processing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Frames received from the server.
    Inbound,
    /// Frames sent to the server.
    Outbound,
}

impl Direction {
    /// Label value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Increment the active connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the active connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a processed frame for the given direction.
pub fn inc_frames(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_PROCESSED, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a heartbeat ping.
pub fn inc_heartbeats() {
    #[cfg(feature = "metrics")]
    counter!(HEARTBEATS_TOTAL).increment(1);
}

/// Record a failed engine operation.
pub fn inc_errors() {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL).increment(1);
}
