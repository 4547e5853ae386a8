//! Async client fetching one resource at a time over a [`Transport`].
//!
//! [`Client::fetch`] sends a `GET`, feeds every matching fragment from the
//! server into its [`Reassembler`] and drives a [`ClientSession`] until the
//! transfer completes, fails or times out. Recovery is whole-transfer only:
//! after a timeout or conflict the [`RetryPolicy`] decides whether a fresh
//! request is sent.

mod error;

use std::{sync::Arc, time::Instant};

use futures::StreamExt;
use log::debug;
use tokio::{select, time};

pub use self::error::FetchError;
use crate::{
    ResourcePath,
    config::SessionConfig,
    fragment::Reassembler,
    hooks::{SharedHooks, no_hooks},
    link::{self, OutboundError},
    message::{Message, Status},
    metrics::{self, Outcome},
    session::{
        ClientSession,
        FailureReason,
        RetryDecision,
        RetryLimit,
        RetryPolicy,
        SessionState,
        TransitionError,
    },
    transport::{Delivery, Incoming, Transport},
};

enum Event<P> {
    Delivery(Option<Delivery<P>>),
    Deadline,
}

/// Fetches resources from one server peer.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use minihttp::{ResourcePath, client::Client, transport::UdpTransport};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = UdpTransport::bind("0.0.0.0:0").await?;
/// let server = "127.0.0.1:4403".parse()?;
/// let mut client = Client::new(Arc::new(transport), server);
/// let html = client.fetch(ResourcePath::new("/index.html")?).await?;
/// println!("{}", String::from_utf8_lossy(&html));
/// # Ok(())
/// # }
/// ```
pub struct Client<T: Transport> {
    transport: Arc<T>,
    server: T::Peer,
    config: SessionConfig,
    retry: Arc<dyn RetryPolicy<T::Peer>>,
    hooks: SharedHooks,
    reassembler: Reassembler<T::Peer>,
    incoming: Incoming<T::Peer>,
}

impl<T: Transport> Client<T> {
    /// Create a client talking to `server` with default settings.
    #[must_use]
    pub fn new(transport: Arc<T>, server: T::Peer) -> Self {
        let config = SessionConfig::default();
        let incoming = transport.incoming();
        Self {
            transport,
            server,
            retry: Arc::new(RetryLimit::new(config.max_attempts)),
            reassembler: Reassembler::new(config.reassembly_timeout),
            config,
            hooks: no_hooks(),
            incoming,
        }
    }

    /// Apply `config`.
    ///
    /// This also resets the retry policy to a [`RetryLimit`] of
    /// `config.max_attempts`; call
    /// [`with_retry_policy`](Self::with_retry_policy) afterwards to override
    /// it.
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        let config = config.normalized();
        self.retry = Arc::new(RetryLimit::new(config.max_attempts));
        self.reassembler = Reassembler::new(config.reassembly_timeout);
        self.config = config;
        self
    }

    /// Use a custom retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: impl RetryPolicy<T::Peer> + 'static) -> Self {
        self.retry = Arc::new(policy);
        self
    }

    /// Install transform hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: SharedHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Server peer requests are sent to.
    #[must_use]
    pub const fn server(&self) -> &T::Peer { &self.server }

    /// Active settings.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig { &self.config }

    /// Number of partial transfers currently buffered.
    #[must_use]
    pub fn buffered_transfers(&self) -> usize { self.reassembler.buffered_len() }

    /// Fetch the full content of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the server rejects the request, when the
    /// retry policy gives up after a timeout or conflict, or when the
    /// transport fails.
    pub async fn fetch(&mut self, path: ResourcePath) -> Result<Vec<u8>, FetchError> {
        let mut session = ClientSession::new(path.clone(), &self.config);
        loop {
            self.reassembler.cancel(&self.server, &path);
            let request = session.begin(now())?;
            tracing::info!(
                peer = %self.server,
                path = %path,
                attempt = session.attempt(),
                "requesting resource"
            );
            let sent = link::send(
                &*self.transport,
                self.hooks.as_ref(),
                &self.server,
                &request.into(),
            )
            .await;
            match sent {
                Ok(()) => {}
                Err(OutboundError::Encode(error)) => return Err(error.into()),
                Err(OutboundError::Send(error)) => {
                    session.on_send_error(error.clone());
                    metrics::inc_transfers(Outcome::Failed);
                    return Err(error.into());
                }
            }

            if let Some(content) = self.await_outcome(&mut session).await? {
                tracing::info!(
                    peer = %self.server,
                    path = %path,
                    bytes = content.len(),
                    "transfer complete"
                );
                metrics::inc_transfers(Outcome::Complete);
                return Ok(content);
            }

            let attempts = session.attempt();
            match session.state().clone() {
                SessionState::TimedOut => {
                    self.reassembler.cancel(&self.server, &path);
                    metrics::set_reassembly_buffers(self.reassembler.buffered_len());
                    if self.retry.on_timeout(&self.server, &path, attempts) == RetryDecision::GiveUp
                    {
                        metrics::inc_transfers(Outcome::TimedOut);
                        return Err(FetchError::TimedOut { attempts });
                    }
                    tracing::warn!(peer = %self.server, path = %path, attempts, "retrying after timeout");
                }
                SessionState::Failed(FailureReason::Conflict(conflict)) => {
                    if self.retry.on_conflict(&self.server, &path, attempts)
                        == RetryDecision::GiveUp
                    {
                        metrics::inc_transfers(Outcome::Failed);
                        return Err(FetchError::Conflict { conflict, attempts });
                    }
                    tracing::warn!(peer = %self.server, path = %path, attempts, "retrying after conflict");
                }
                SessionState::Failed(FailureReason::Rejected(response)) => {
                    let outcome = if response.status == Status::NotFound {
                        Outcome::NotFound
                    } else {
                        Outcome::Failed
                    };
                    metrics::inc_transfers(outcome);
                    return Err(FetchError::Rejected(response));
                }
                SessionState::Failed(FailureReason::Send(error)) => {
                    metrics::inc_transfers(Outcome::Failed);
                    return Err(FetchError::Send(error));
                }
                other => return Err(TransitionError::new(&other, "finish a fetch").into()),
            }
        }
    }

    /// Wait until the session leaves its active states.
    ///
    /// Returns the content on completion and `None` for any other terminal
    /// state.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    async fn await_outcome(
        &mut self,
        session: &mut ClientSession,
    ) -> Result<Option<Vec<u8>>, FetchError> {
        while let Some(deadline) = session.deadline() {
            let event = select! {
                delivery = self.incoming.next() => Event::Delivery(delivery),
                () = time::sleep_until(time::Instant::from_std(deadline)) => Event::Deadline,
            };
            match event {
                Event::Delivery(None) => return Err(FetchError::Closed),
                Event::Delivery(Some(delivery)) => {
                    if let Some(content) = self.handle(session, &delivery) {
                        return Ok(Some(content));
                    }
                }
                Event::Deadline => {
                    let now = now();
                    session.check_timeout(now);
                    self.reassembler.evict_expired_at(now);
                    metrics::set_reassembly_buffers(self.reassembler.buffered_len());
                }
            }
        }
        Ok(None)
    }

    fn handle(
        &mut self,
        session: &mut ClientSession,
        delivery: &Delivery<T::Peer>,
    ) -> Option<Vec<u8>> {
        if delivery.peer != self.server {
            debug!("ignoring frame from unexpected peer: peer={}", delivery.peer);
            return None;
        }
        match link::receive(self.hooks.as_ref(), delivery)? {
            Message::Fragment(fragment) if &fragment.path == session.path() => {
                let now = now();
                let status = self.reassembler.ingest_at(&delivery.peer, fragment, now);
                metrics::set_reassembly_buffers(self.reassembler.buffered_len());
                session.on_status(status, now)
            }
            Message::Error(response) if &response.path == session.path() => {
                session.on_error(response);
                None
            }
            other => {
                debug!("ignoring unrelated message: path={}", other.path());
                None
            }
        }
    }
}

/// Current time on tokio's clock, so paused-time tests stay consistent.
fn now() -> Instant { time::Instant::now().into_std() }
