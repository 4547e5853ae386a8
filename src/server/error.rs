//! Errors raised by [`Server`](super::Server) operations.

use thiserror::Error;

/// Errors that may occur while running the server.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServerError {
    /// The transport's inbound stream ended before shutdown was requested.
    #[error("transport closed")]
    TransportClosed,
}
