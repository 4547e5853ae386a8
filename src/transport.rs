//! Contract for the message-oriented link underneath the protocol.
//!
//! A [`Transport`] moves whole frames between peers. It gives no ordering or
//! delivery guarantee: frames may be lost, duplicated or reordered, and the
//! protocol layers above cope with all three. Each frame is delivered
//! atomically or not at all.

use std::{fmt, hash::Hash, io};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

pub mod udp;

pub use udp::UdpTransport;

/// One frame received from a peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery<P> {
    /// Sender of the frame.
    pub peer: P,
    /// Raw frame bytes.
    pub frame: Bytes,
}

impl<P> Delivery<P> {
    /// Pair a frame with its sender.
    pub fn new(peer: P, frame: impl Into<Bytes>) -> Self {
        Self {
            peer,
            frame: frame.into(),
        }
    }
}

/// Lazy, effectively endless sequence of inbound frames.
pub type Incoming<P> = BoxStream<'static, Delivery<P>>;

/// Reasons a frame could not be handed to the transport.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The frame exceeds the link's per-message ceiling.
    #[error("frame of {size} bytes exceeds the {max}-byte link limit")]
    Oversized {
        /// Frame length.
        size: usize,
        /// Link ceiling.
        max: usize,
    },
    /// The destination peer is not reachable on this link.
    #[error("peer {0} is unreachable")]
    Unreachable(String),
    /// The transport has shut down.
    #[error("transport closed")]
    Closed,
    /// The underlying socket reported an error.
    #[error("transport I/O error ({kind}): {message}")]
    Io {
        /// Error category.
        kind: io::ErrorKind,
        /// Error text.
        message: String,
    },
}

impl From<io::Error> for SendError {
    fn from(error: io::Error) -> Self {
        Self::Io {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Send/receive primitive consumed by the client and server drivers.
///
/// `incoming` may be called more than once; implementations decide whether
/// the returned streams share one queue.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Address naming a peer on the link.
    type Peer: Clone + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    /// Hand one frame to the link for delivery to `peer`.
    ///
    /// # Errors
    ///
    /// Returns [`SendError`] if the link refuses the frame. Callers do not
    /// retry.
    async fn send(&self, peer: &Self::Peer, frame: Bytes) -> Result<(), SendError>;

    /// Stream of frames received from any peer.
    fn incoming(&self) -> Incoming<Self::Peer>;
}
