//! Async request loop serving content over a [`Transport`].
//!
//! The loop decodes inbound frames and spawns one task per request. Each task
//! drives a [`ServerSession`]: read a snapshot from the [`ContentStore`],
//! fragment it and hand every fragment to the transport back-to-back, or send
//! a bounded failure reply. An in-flight registry keyed by `(peer, path)`
//! drops a repeated `GET` while the transfer for that key is still being
//! emitted, so two transfers for one key never interleave. Distinct keys
//! proceed in parallel.

mod error;

use std::{future::Future, sync::Arc};

use dashmap::DashSet;
use futures::StreamExt;
use log::{debug, warn};
use tokio::{select, signal};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

pub use self::error::ServerError;
use crate::{
    fragment::{Fragmenter, TransferKey},
    hooks::{ContentDecision, SharedHooks, no_hooks},
    link::{self, OutboundError},
    message::{ErrorResponse, Message, Request, Status},
    session::{ServerPlan, ServerSession},
    store::ContentStore,
    transport::{Delivery, Transport},
};

/// Serves resources from a [`ContentStore`] to peers on a [`Transport`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use minihttp::{
///     server::Server,
///     store::DirectoryStore,
///     transport::UdpTransport,
/// };
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = UdpTransport::bind("0.0.0.0:4403").await?;
/// let server = Server::new(Arc::new(transport), Arc::new(DirectoryStore::new("html")));
/// server.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct Server<T: Transport, S> {
    transport: Arc<T>,
    store: Arc<S>,
    fragmenter: Fragmenter,
    hooks: SharedHooks,
    in_flight: DashSet<TransferKey<T::Peer>>,
}

impl<T, S> Server<T, S>
where
    T: Transport,
    S: ContentStore,
{
    /// Create a server answering requests from `transport` with `store`.
    #[must_use]
    pub fn new(transport: Arc<T>, store: Arc<S>) -> Self {
        Self {
            transport,
            store,
            fragmenter: Fragmenter::new(),
            hooks: no_hooks(),
            in_flight: DashSet::new(),
        }
    }

    /// Use a custom fragmenter.
    #[must_use]
    pub fn with_fragmenter(mut self, fragmenter: Fragmenter) -> Self {
        self.fragmenter = fragmenter;
        self
    }

    /// Install transform hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: SharedHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Run the server until Ctrl+C is received.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::TransportClosed`] if the transport stops
    /// delivering frames first.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(async {
            let _ = signal::ctrl_c().await;
        })
        .await
    }

    /// Run the server until `shutdown` resolves.
    ///
    /// Requests still being served when shutdown fires are cancelled
    /// between fragments.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::TransportClosed`] if the transport stops
    /// delivering frames first.
    #[expect(
        clippy::integer_division_remainder_used,
        reason = "tokio::select! expands to modulus internally"
    )]
    pub async fn run_with_shutdown<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send,
    {
        let server = Arc::new(self);
        let token = CancellationToken::new();
        let tracker = TaskTracker::new();
        let mut incoming = server.transport.incoming();
        tokio::pin!(shutdown);

        let result = loop {
            let delivery = select! {
                biased;
                () = &mut shutdown => break Ok(()),
                delivery = incoming.next() => delivery,
            };
            let Some(delivery) = delivery else {
                warn!("transport closed, stopping server");
                break Err(ServerError::TransportClosed);
            };
            let Some(request) = server.request_from(&delivery) else {
                continue;
            };

            let key = TransferKey::new(delivery.peer.clone(), request.path.clone());
            if !server.in_flight.insert(key.clone()) {
                debug!("transfer already in flight, dropping repeated request: key={key}");
                continue;
            }
            let guard = InFlightGuard {
                server: Arc::clone(&server),
                key,
            };
            let token = token.clone();
            let peer = delivery.peer;
            tracker.spawn(async move {
                token
                    .run_until_cancelled(guard.server.serve(&peer, request))
                    .await;
                drop(guard);
            });
        };

        token.cancel();
        tracker.close();
        tracker.wait().await;
        result
    }

    fn request_from(&self, delivery: &Delivery<T::Peer>) -> Option<Request> {
        match link::receive(self.hooks.as_ref(), delivery)? {
            Message::Request(request) => Some(request),
            other => {
                debug!(
                    "ignoring non-request message: peer={}, path={}",
                    delivery.peer,
                    other.path()
                );
                None
            }
        }
    }

    async fn serve(&self, peer: &T::Peer, request: Request) {
        let path = request.path.clone();
        let mut session = ServerSession::new();
        if let Err(error) = session.listen().and_then(|()| session.accept(request)) {
            warn!("cannot serve request: peer={peer}, error={error}");
            return;
        }

        let lookup = self.store.read(&path).await;
        if let Ok(content) = &lookup
            && self.hooks.validate_content(&path, content) == ContentDecision::NotModified
        {
            tracing::info!(peer = %peer, path = %path, "content not modified, sending anyway");
        }
        let plan = match session.resolve(lookup, &self.fragmenter) {
            Ok(plan) => plan,
            Err(error) => {
                warn!("cannot resolve request: peer={peer}, error={error}");
                return;
            }
        };

        match plan {
            ServerPlan::Transfer(fragments) => {
                for fragment in fragments {
                    match link::send(&*self.transport, self.hooks.as_ref(), peer, &fragment.into())
                        .await
                    {
                        Ok(()) => {
                            if let Err(error) = session.fragment_sent() {
                                warn!("fragment bookkeeping failed: peer={peer}, error={error}");
                                return;
                            }
                        }
                        Err(OutboundError::Encode(error)) => {
                            warn!("cannot encode fragment: peer={peer}, path={path}, error={error}");
                            let reply = session.fail(Status::InternalError, "encode failed");
                            self.reply(peer, reply).await;
                            break;
                        }
                        Err(OutboundError::Send(error)) => {
                            warn!("fragment send failed: peer={peer}, path={path}, error={error}");
                            session.send_failed(error);
                            break;
                        }
                    }
                }
            }
            ServerPlan::Reply(reply) => self.reply(peer, reply).await,
            ServerPlan::Nothing => {}
        }

        tracing::info!(
            peer = %peer,
            path = %path,
            outcome = session.state().name(),
            "request served"
        );
    }

    async fn reply(&self, peer: &T::Peer, reply: ErrorResponse) {
        tracing::info!(
            peer = %peer,
            path = %reply.path,
            status = reply.status.code(),
            "sending failure response"
        );
        if let Err(error) =
            link::send(&*self.transport, self.hooks.as_ref(), peer, &reply.into()).await
        {
            warn!("failure response not sent: peer={peer}, error={error}");
        }
    }
}

/// Clears the in-flight entry when a request task ends or is cancelled.
struct InFlightGuard<T: Transport, S> {
    server: Arc<Server<T, S>>,
    key: TransferKey<T::Peer>,
}

impl<T: Transport, S> Drop for InFlightGuard<T, S> {
    fn drop(&mut self) { self.server.in_flight.remove(&self.key); }
}
