//! Pluggable reliability strategy consulted when an attempt ends badly.
//!
//! The protocol has no acknowledgements; the only recovery is a fresh
//! request for the whole transfer. A [`RetryPolicy`] decides whether to issue
//! one.

use crate::ResourcePath;

/// Whether the client should issue a fresh request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Request the whole transfer again.
    Retry,
    /// Report the failure to the caller.
    GiveUp,
}

/// Decides whether a failed attempt is repeated.
///
/// `attempt` is the one-based number of the attempt that just ended.
pub trait RetryPolicy<P>: Send + Sync {
    /// Called when an attempt timed out.
    fn on_timeout(&self, peer: &P, path: &ResourcePath, attempt: u32) -> RetryDecision;

    /// Called when the reassembly buffer was discarded after a conflict.
    fn on_conflict(&self, peer: &P, path: &ResourcePath, attempt: u32) -> RetryDecision {
        self.on_timeout(peer, path, attempt)
    }
}

/// Never retries.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRetry;

impl<P> RetryPolicy<P> for NoRetry {
    fn on_timeout(&self, _peer: &P, _path: &ResourcePath, _attempt: u32) -> RetryDecision {
        RetryDecision::GiveUp
    }
}

/// Retries until a fixed number of attempts have been made.
///
/// # Examples
///
/// ```
/// use minihttp::{
///     ResourcePath,
///     session::{RetryDecision, RetryLimit, RetryPolicy},
/// };
///
/// let policy = RetryLimit::new(2);
/// let path = ResourcePath::new("/a").expect("valid path");
/// assert_eq!(policy.on_timeout(&(), &path, 1), RetryDecision::Retry);
/// assert_eq!(policy.on_timeout(&(), &path, 2), RetryDecision::GiveUp);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryLimit {
    max_attempts: u32,
}

impl RetryLimit {
    /// Allow up to `max_attempts` attempts in total, at least one.
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
        }
    }

    /// Attempts allowed, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 { self.max_attempts }
}

impl<P> RetryPolicy<P> for RetryLimit {
    fn on_timeout(&self, _peer: &P, _path: &ResourcePath, attempt: u32) -> RetryDecision {
        if attempt < self.max_attempts {
            RetryDecision::Retry
        } else {
            RetryDecision::GiveUp
        }
    }
}
