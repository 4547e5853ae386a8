//! Metric helpers for `minihttp`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! every helper is a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking envelopes sent and received.
pub const ENVELOPES_TOTAL: &str = "minihttp_envelopes_total";
/// Name of the counter tracking inbound frames dropped before decoding
/// completed.
pub const ENVELOPES_DROPPED: &str = "minihttp_envelopes_dropped_total";
/// Name of the counter tracking finished transfers by outcome.
pub const TRANSFERS_TOTAL: &str = "minihttp_transfers_total";
/// Name of the gauge tracking live reassembly buffers.
pub const REASSEMBLY_BUFFERS: &str = "minihttp_reassembly_buffers";

/// Direction of envelope processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Envelopes received from a peer.
    Inbound,
    /// Envelopes handed to the transport.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// How a transfer ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Content was delivered.
    Complete,
    /// The transfer failed other than by a missing resource.
    Failed,
    /// The client gave up after its deadline.
    TimedOut,
    /// The resource did not exist.
    NotFound,
}

impl Outcome {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Complete => "complete",
            Outcome::Failed => "failed",
            Outcome::TimedOut => "timed_out",
            Outcome::NotFound => "not_found",
        }
    }
}

/// Record an envelope for the given direction.
pub fn inc_envelopes(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(ENVELOPES_TOTAL, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record an inbound frame that was dropped.
pub fn inc_dropped() {
    #[cfg(feature = "metrics")]
    counter!(ENVELOPES_DROPPED).increment(1);
}

/// Record a finished transfer.
pub fn inc_transfers(outcome: Outcome) {
    #[cfg(feature = "metrics")]
    counter!(TRANSFERS_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome;
}

/// Publish the number of live reassembly buffers.
pub fn set_reassembly_buffers(count: usize) {
    #[cfg(feature = "metrics")]
    #[expect(
        clippy::cast_precision_loss,
        reason = "buffer counts are far below f64 precision limits"
    )]
    gauge!(REASSEMBLY_BUFFERS).set(count as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = count;
}
