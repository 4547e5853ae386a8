//! Client half of the exchange.
//!
//! [`ClientSession`] is a pure state machine: the caller feeds it the
//! [`ReassemblyStatus`] produced for each fragment of the expected path,
//! failure replies and clock readings, and reads back the state. Owning the
//! [`Reassembler`](crate::fragment::Reassembler) and the transport is left to
//! the async [`Client`](crate::client::Client).

use std::time::{Duration, Instant};

use log::{debug, warn};

use super::{FailureReason, SessionState, TransitionError};
use crate::{
    ResourcePath,
    config::{SessionConfig, TimeoutPolicy},
    fragment::ReassemblyStatus,
    message::{ErrorResponse, Request},
    transport::SendError,
};

/// State machine for one client request and its retries.
#[derive(Debug)]
pub struct ClientSession {
    path: ResourcePath,
    state: SessionState,
    timeout: Duration,
    policy: TimeoutPolicy,
    deadline: Option<Instant>,
    attempt: u32,
}

impl ClientSession {
    /// Create an idle session for `path`.
    #[must_use]
    pub fn new(path: ResourcePath, config: &SessionConfig) -> Self {
        let config = config.normalized();
        Self {
            path,
            state: SessionState::Idle,
            timeout: config.request_timeout,
            policy: config.timeout_policy,
            deadline: None,
            attempt: 0,
        }
    }

    /// Path being fetched.
    #[must_use]
    pub const fn path(&self) -> &ResourcePath { &self.path }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SessionState { &self.state }

    /// Instant at which the current attempt times out.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> { self.deadline }

    /// One-based number of the current attempt; zero before the first.
    #[must_use]
    pub const fn attempt(&self) -> u32 { self.attempt }

    /// Start an attempt, returning the request to send.
    ///
    /// Allowed from `Idle`, and from `TimedOut` or a conflict failure to
    /// retry.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] while an attempt is still running, or
    /// after completion or a failure reply.
    pub fn begin(&mut self, now: Instant) -> Result<Request, TransitionError> {
        match self.state {
            SessionState::Idle
            | SessionState::TimedOut
            | SessionState::Failed(FailureReason::Conflict(_)) => {}
            ref other => return Err(TransitionError::new(other, "send a request")),
        }
        self.attempt += 1;
        self.deadline = Some(now + self.timeout);
        self.state = SessionState::AwaitingFirstFragment;
        debug!("request sent: path={}, attempt={}", self.path, self.attempt);
        Ok(Request::new(self.path.clone()))
    }

    /// Apply the reassembler's verdict on a fragment for this path.
    ///
    /// Returns the reconstructed content when the transfer completes. Input
    /// arriving outside an active attempt is ignored.
    pub fn on_status(&mut self, status: ReassemblyStatus, now: Instant) -> Option<Vec<u8>> {
        let previous = match self.state {
            SessionState::AwaitingFirstFragment => 0,
            SessionState::InProgress { completed, .. } => completed,
            _ => return None,
        };
        match status {
            ReassemblyStatus::Incomplete { received, total } => {
                if received > previous && self.policy == TimeoutPolicy::ResetOnProgress {
                    self.deadline = Some(now + self.timeout);
                }
                self.state = SessionState::InProgress {
                    completed: received,
                    total,
                };
                None
            }
            ReassemblyStatus::Complete(content) => {
                self.state = SessionState::Complete;
                self.deadline = None;
                Some(content)
            }
            ReassemblyStatus::Conflict(conflict) => {
                warn!("transfer failed: path={}, error={conflict}", self.path);
                self.state = SessionState::Failed(FailureReason::Conflict(conflict));
                self.deadline = None;
                None
            }
        }
    }

    /// Apply a failure reply from the server.
    pub fn on_error(&mut self, response: ErrorResponse) {
        if !self.is_active() {
            return;
        }
        warn!(
            "server rejected request: path={}, status={}, reason={}",
            self.path, response.status, response.reason
        );
        self.state = SessionState::Failed(FailureReason::Rejected(response));
        self.deadline = None;
    }

    /// Record that the request could not be sent.
    pub fn on_send_error(&mut self, error: SendError) {
        self.state = SessionState::Failed(FailureReason::Send(error));
        self.deadline = None;
    }

    /// Move to `TimedOut` if the deadline has passed. Returns whether the
    /// transition happened.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if self.is_active() && now >= deadline => {
                warn!(
                    "transfer timed out: path={}, attempt={}, state={}",
                    self.path,
                    self.attempt,
                    self.state.name()
                );
                self.state = SessionState::TimedOut;
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    fn is_active(&self) -> bool {
        matches!(
            self.state,
            SessionState::AwaitingFirstFragment | SessionState::InProgress { .. }
        )
    }
}
