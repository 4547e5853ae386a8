//! Error types for [`Client`](super::Client) operations.

use thiserror::Error;

use crate::{
    codec::CodecError,
    fragment::ReassemblyConflict,
    message::{ErrorResponse, Status},
    session::TransitionError,
    transport::SendError,
};

/// Reasons a fetch ended without content.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a failure reply.
    #[error("server replied {}: {}", .0.status, .0.reason)]
    Rejected(ErrorResponse),
    /// Every attempt ran past its deadline.
    #[error("no complete transfer after {attempts} attempt(s)")]
    TimedOut {
        /// Attempts made.
        attempts: u32,
    },
    /// The last attempt's buffer was discarded after a conflict.
    #[error("transfer corrupted after {attempts} attempt(s): {conflict}")]
    Conflict {
        /// What was inconsistent.
        conflict: ReassemblyConflict,
        /// Attempts made.
        attempts: u32,
    },
    /// The request could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[from] CodecError),
    /// The transport refused the request.
    #[error("failed to send request: {0}")]
    Send(#[from] SendError),
    /// The transport's inbound stream ended.
    #[error("transport closed")]
    Closed,
    /// The session refused an event.
    #[error(transparent)]
    Session(#[from] TransitionError),
}

impl FetchError {
    /// Whether the server reported the resource as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Rejected(response) if response.status == Status::NotFound)
    }
}
