#![doc(html_root_url = "https://docs.rs/minihttp/latest")]
//! Public API for the `minihttp` library.
//!
//! MiniHTTP moves a single HTML document from a server to a client across a
//! message-oriented link with a hard 200-byte ceiling per message and no
//! ordering or delivery guarantee. Content is split into at most 99
//! fragments of up to 122 bytes, sent as independent JSON envelopes, and
//! reassembled per `(peer, path)` on the receiving side.
//!
//! The pure core ([`codec`], [`fragment`], [`session`]) performs no I/O; the
//! async [`server::Server`] and [`client::Client`] drive it over any
//! [`transport::Transport`].

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod fragment;
pub mod hooks;
mod link;
pub mod message;
pub mod metrics;
pub mod path;
pub mod server;
pub mod session;
pub mod store;
pub mod transport;

pub use client::{Client, FetchError};
pub use codec::{CodecError, decode, encode};
pub use error::{Error, Result};
pub use fragment::{
    FragmentBatch,
    FragmentIndex,
    FragmentSeries,
    FragmentationError,
    Fragmenter,
    ReassemblyConflict,
    ReassemblyStatus,
    Reassembler,
    TransferKey,
};
pub use message::{ErrorResponse, Fragment, Message, Request, Status};
pub use path::{DEFAULT_PATH, PathError, ResourcePath};
pub use server::{Server, ServerError};
pub use transport::{Delivery, SendError, Transport};
