//! Metric helpers for `relayframe`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the gauge tracking active connections.
pub const CONNECTIONS_ACTIVE: &str = "relayframe_connections_active";
/// Name of the counter tracking messages routed to the sink.
pub const MESSAGES_TOTAL: &str = "relayframe_messages_total";
/// Name of the counter tracking error occurrences.
pub const ERRORS_TOTAL: &str = "relayframe_errors_total";
/// Name of the counter tracking panicking connection tasks.
pub const CONNECTION_PANICS: &str = "relayframe_connection_panics_total";

/// Category of a recorded error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A frame could never be valid.
    Framing,
    /// A connection closed part-way through a frame.
    TrailingData,
    /// Reading from a connection failed.
    Io,
    /// Accepting a connection failed.
    Accept,
    /// The message sink was closed.
    Sink,
}

impl ErrorKind {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Self::Framing => "framing",
            Self::TrailingData => "trailing_data",
            Self::Io => "io",
            Self::Accept => "accept",
            Self::Sink => "sink",
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

/// Record a message routed to the sink.
pub fn inc_messages() {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_TOTAL).increment(1);
}

/// Record an error occurrence.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
pub fn inc_errors(kind: ErrorKind) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Record a panicking connection task.
pub fn inc_connection_panics() {
    #[cfg(feature = "metrics")]
    counter!(CONNECTION_PANICS).increment(1);
}
