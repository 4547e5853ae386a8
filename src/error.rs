//! Canonical error and result types for the crate.
//!
//! Each component keeps its own error type; [`Error`] gathers them for
//! callers that drive several components, such as the `minihttp` binary.

use std::io;

use thiserror::Error;

use crate::{
    client::FetchError,
    codec::CodecError,
    fragment::FragmentationError,
    path::PathError,
    server::ServerError,
    session::TransitionError,
    store::StoreError,
    transport::SendError,
};

/// Top-level error type exposed by `minihttp`.
#[derive(Debug, Error)]
pub enum Error {
    /// A resource path was rejected.
    #[error(transparent)]
    Path(#[from] PathError),
    /// An envelope could not be encoded or decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Content could not be fragmented.
    #[error(transparent)]
    Fragmentation(#[from] FragmentationError),
    /// The content store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The transport refused a frame.
    #[error(transparent)]
    Send(#[from] SendError),
    /// A session refused an event.
    #[error(transparent)]
    Transition(#[from] TransitionError),
    /// A fetch ended without content.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The server stopped unexpectedly.
    #[error(transparent)]
    Server(#[from] ServerError),
    /// Local I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Canonical result alias used by `minihttp` public APIs.
pub type Result<T> = std::result::Result<T, Error>;
