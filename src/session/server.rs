//! Server half of the exchange: one request in, fragments or a failure out.

use bytes::Bytes;
use log::{debug, info};

use super::{FailureReason, SessionState, TransitionError};
use crate::{
    ResourcePath,
    fragment::{FragmentationError, Fragmenter},
    message::{ErrorResponse, Fragment, Request, Status},
    store::StoreError,
    transport::SendError,
};

/// What the server must hand to the transport after resolving a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerPlan {
    /// Send these fragments back-to-back, in order.
    Transfer(Vec<Fragment>),
    /// Send this failure reply.
    Reply(ErrorResponse),
    /// Send nothing.
    Nothing,
}

/// State machine for serving a single request.
///
/// The session never waits for acknowledgements. It completes once the last
/// planned fragment has been handed to the transport.
#[derive(Debug)]
pub struct ServerSession {
    state: SessionState,
    request: Option<Request>,
    pending: usize,
}

impl Default for ServerSession {
    fn default() -> Self { Self::new() }
}

impl ServerSession {
    /// Create an idle session.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: SessionState::Idle,
            request: None,
            pending: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &SessionState { &self.state }

    /// Request being served, once accepted.
    #[must_use]
    pub const fn request(&self) -> Option<&Request> { self.request.as_ref() }

    /// Start waiting for a request.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless the session is idle.
    pub fn listen(&mut self) -> Result<(), TransitionError> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::AwaitingRequest;
                Ok(())
            }
            ref other => Err(TransitionError::new(other, "listen")),
        }
    }

    /// Accept a decoded request and move on to resolving its path.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless the session is idle or awaiting a
    /// request.
    pub fn accept(&mut self, request: Request) -> Result<(), TransitionError> {
        match self.state {
            SessionState::Idle | SessionState::AwaitingRequest => {
                self.request = Some(request);
                self.state = SessionState::Resolving;
                Ok(())
            }
            ref other => Err(TransitionError::new(other, "accept a request")),
        }
    }

    /// Turn the content lookup result into an outbound plan.
    ///
    /// Store and fragmentation failures become a bounded failure reply so
    /// the client never waits for its full timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless a request is being resolved.
    pub fn resolve(
        &mut self,
        lookup: Result<Bytes, StoreError>,
        fragmenter: &Fragmenter,
    ) -> Result<ServerPlan, TransitionError> {
        let request = match (&self.state, &self.request) {
            (SessionState::Resolving, Some(request)) => request.clone(),
            (other, _) => return Err(TransitionError::new(other, "resolve content")),
        };

        let content = match lookup {
            Ok(content) => content,
            Err(error) => {
                let (status, reason) = store_failure(&error);
                return Ok(ServerPlan::Reply(self.fail(status, reason)));
            }
        };
        let batch = match fragmenter.fragment(&request.path, &content) {
            Ok(batch) => batch,
            Err(error) => {
                let (status, reason) = fragmentation_failure(&error);
                return Ok(ServerPlan::Reply(self.fail(status, reason)));
            }
        };

        let total = batch.total();
        let fragments = match request.fragment {
            None => batch.into_fragments(),
            Some(seq) => match batch.get(seq) {
                Some(fragment) => vec![fragment.clone()],
                None => {
                    debug!(
                        "single fragment out of range: path={}, requested={seq}, total={total}",
                        request.path
                    );
                    self.state = SessionState::Failed(FailureReason::FragmentOutOfRange {
                        requested: seq,
                        total,
                    });
                    return Ok(ServerPlan::Nothing);
                }
            },
        };

        self.pending = fragments.len();
        self.state = SessionState::InProgress {
            completed: 0,
            total,
        };
        Ok(ServerPlan::Transfer(fragments))
    }

    /// Record that one planned fragment was handed to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`] unless a transfer is in progress.
    pub fn fragment_sent(&mut self) -> Result<(), TransitionError> {
        let SessionState::InProgress { completed, total } = self.state else {
            return Err(TransitionError::new(&self.state, "record a sent fragment"));
        };
        self.pending = self.pending.saturating_sub(1);
        self.state = if self.pending == 0 {
            SessionState::Complete
        } else {
            SessionState::InProgress {
                completed: completed + 1,
                total,
            }
        };
        Ok(())
    }

    /// Abandon the exchange with a failure reply.
    ///
    /// Used when a planned fragment cannot be encoded. Returns the reply to
    /// send.
    pub fn fail(&mut self, status: Status, reason: impl Into<String>) -> ErrorResponse {
        let path = self
            .request
            .as_ref()
            .map(|request| request.path.clone())
            .unwrap_or_else(ResourcePath::root);
        let response = ErrorResponse::new(path, status, reason);
        info!(
            "request failed: path={}, status={}, reason={}",
            response.path, response.status, response.reason
        );
        self.state = SessionState::Failed(FailureReason::Rejected(response.clone()));
        response
    }

    /// Record a transport refusal. The session ends in `Failed`.
    pub fn send_failed(&mut self, error: SendError) {
        self.state = SessionState::Failed(FailureReason::Send(error));
    }
}

fn store_failure(error: &StoreError) -> (Status, &'static str) {
    match error {
        StoreError::NotFound(_) => (Status::NotFound, "not found"),
        StoreError::InvalidPath { .. } => (Status::BadRequest, "invalid path"),
        StoreError::Io { .. } => (Status::InternalError, "read failed"),
    }
}

fn fragmentation_failure(error: &FragmentationError) -> (Status, &'static str) {
    match error {
        FragmentationError::PathTooLong { .. } => (Status::BadRequest, "path too long"),
        FragmentationError::ContentTooLarge { .. } => {
            (Status::ContentTooLarge, "content exceeds 99 fragments")
        }
        FragmentationError::InvalidUtf8 { .. } => (Status::InternalError, "content is not UTF-8"),
    }
}
