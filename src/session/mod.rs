//! Request/response state machines.
//!
//! [`ServerSession`] and [`ClientSession`] hold no I/O: the async drivers in
//! [`crate::server`] and [`crate::client`] feed them events and act on the
//! resulting state. Retry behaviour is pluggable through [`RetryPolicy`].

mod client;
mod retry;
mod server;
mod state;

pub use client::ClientSession;
pub use retry::{NoRetry, RetryDecision, RetryLimit, RetryPolicy};
pub use server::{ServerPlan, ServerSession};
pub use state::{FailureReason, SessionState, TransitionError};
