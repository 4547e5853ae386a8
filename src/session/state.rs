//! States shared by the server and client session machines.

use thiserror::Error;

use crate::{
    fragment::{FragmentIndex, ReassemblyConflict},
    message::ErrorResponse,
    transport::SendError,
};

/// Lifecycle of one request/response exchange.
///
/// Servers move `Idle -> AwaitingRequest -> Resolving -> InProgress ->
/// Complete | Failed`; clients move `Idle -> AwaitingFirstFragment ->
/// InProgress -> Complete | Failed | TimedOut`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing has happened yet.
    Idle,
    /// Server is waiting for a request.
    AwaitingRequest,
    /// Server is looking the requested path up.
    Resolving,
    /// Client has sent a request and seen no fragment yet.
    AwaitingFirstFragment,
    /// Fragments are flowing.
    InProgress {
        /// Fragments received (client) or handed to the transport (server).
        completed: usize,
        /// Fragments in the transfer.
        total: FragmentIndex,
    },
    /// The transfer finished.
    Complete,
    /// The transfer ended without content.
    Failed(FailureReason),
    /// The client deadline passed before completion.
    TimedOut,
}

impl SessionState {
    /// Whether no further event changes the state.
    ///
    /// `TimedOut` counts as terminal for the attempt even though the caller
    /// may start a new one.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed(_) | Self::TimedOut)
    }

    /// Short label used in logs and transition errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingRequest => "awaiting_request",
            Self::Resolving => "resolving",
            Self::AwaitingFirstFragment => "awaiting_first_fragment",
            Self::InProgress { .. } => "in_progress",
            Self::Complete => "complete",
            Self::Failed(_) => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Why a session ended in [`SessionState::Failed`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FailureReason {
    /// A failure reply was sent (server) or received (client).
    #[error("{} {}", .0.status, .0.reason)]
    Rejected(ErrorResponse),
    /// The reassembly buffer was discarded.
    #[error("reassembly conflict: {0}")]
    Conflict(ReassemblyConflict),
    /// A single-fragment request named a fragment past the end.
    #[error("fragment {requested} requested but transfer has {total}")]
    FragmentOutOfRange {
        /// Requested sequence number.
        requested: FragmentIndex,
        /// Fragments in the transfer.
        total: FragmentIndex,
    },
    /// The transport refused a frame.
    #[error("send failed: {0}")]
    Send(SendError),
}

/// An event arrived in a state that cannot accept it.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cannot {event} while {state}")]
pub struct TransitionError {
    /// State the session was in.
    pub state: &'static str,
    /// Event that was refused.
    pub event: &'static str,
}

impl TransitionError {
    pub(crate) const fn new(state: &SessionState, event: &'static str) -> Self {
        Self {
            state: state.name(),
            event,
        }
    }
}
