//! In-memory stand-in for a lossy mesh link.
//!
//! A [`MemoryMesh`] connects any number of [`MeshEndpoint`]s. Every frame
//! passes through an optional fault rule that decides its [`Fate`], so tests
//! can drop, duplicate or reorder specific envelopes deterministically.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{
    StreamExt,
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    lock::Mutex as AsyncMutex,
    stream,
};
use minihttp::{
    Delivery,
    Fragment,
    Message,
    SendError,
    Transport,
    codec::ENVELOPE_LIMIT,
    transport::Incoming,
};

/// Address of a node on the mesh, printed as `!0000abcd`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "!{:08x}", self.0) }
}

/// What the mesh does with one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Fate {
    /// Deliver once.
    #[default]
    Deliver,
    /// Lose the frame.
    Drop,
    /// Deliver twice.
    Duplicate,
    /// Hold the frame back until after the next frame for the same node, or
    /// until [`MemoryMesh::flush`].
    Delay,
}

/// A frame in transit, as seen by a fault rule.
#[derive(Clone, Debug)]
pub struct FrameInfo {
    /// Sender.
    pub from: NodeId,
    /// Destination.
    pub to: NodeId,
    /// Zero-based count of frames sent on the mesh before this one.
    pub index: usize,
    /// Decoded envelope, if the frame decodes.
    pub message: Option<Message>,
}

impl FrameInfo {
    /// The content fragment carried by the frame, if any.
    #[must_use]
    pub fn fragment(&self) -> Option<&Fragment> {
        match &self.message {
            Some(Message::Fragment(fragment)) => Some(fragment),
            _ => None,
        }
    }

    /// Whether the frame carries a `GET`.
    #[must_use]
    pub fn is_request(&self) -> bool { matches!(self.message, Some(Message::Request(_))) }
}

/// Counters describing what the mesh did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshStats {
    /// Frames handed to the mesh.
    pub sent: usize,
    /// Frames lost.
    pub dropped: usize,
    /// Frames delivered twice.
    pub duplicated: usize,
    /// Frames held back.
    pub delayed: usize,
}

type FaultRule = Box<dyn FnMut(&FrameInfo) -> Fate + Send>;

struct Node {
    tx: UnboundedSender<Delivery<NodeId>>,
    held: Vec<Delivery<NodeId>>,
}

impl Node {
    fn push(&self, delivery: Delivery<NodeId>) {
        // A closed receiver means the node went away; the frame is lost.
        let _ = self.tx.unbounded_send(delivery);
    }

    fn release_held(&mut self) {
        for delivery in std::mem::take(&mut self.held) {
            self.push(delivery);
        }
    }
}

#[derive(Default)]
struct MeshState {
    nodes: HashMap<NodeId, Node>,
    rule: Option<FaultRule>,
    stats: MeshStats,
}

/// Shared in-memory link. Clones refer to the same mesh.
#[derive(Clone, Default)]
pub struct MemoryMesh {
    state: Arc<Mutex<MeshState>>,
}

impl fmt::Debug for MemoryMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryMesh")
            .field("nodes", &state.nodes.keys().collect::<Vec<_>>())
            .field("rule", &state.rule.as_ref().map(|_| "Some(<rule>)"))
            .field("stats", &state.stats)
            .finish()
    }
}

impl MemoryMesh {
    /// Create an empty mesh that delivers everything.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Join the mesh as `id`, replacing any earlier endpoint with that id.
    #[must_use]
    pub fn endpoint(&self, id: NodeId) -> MeshEndpoint {
        let (tx, rx) = mpsc::unbounded();
        self.lock().nodes.insert(
            id,
            Node {
                tx,
                held: Vec::new(),
            },
        );
        MeshEndpoint {
            id,
            mesh: self.clone(),
            rx: Arc::new(AsyncMutex::new(rx)),
        }
    }

    /// Install a fault rule consulted for every subsequent frame.
    pub fn set_rule(&self, rule: impl FnMut(&FrameInfo) -> Fate + Send + 'static) {
        self.lock().rule = Some(Box::new(rule));
    }

    /// Remove the fault rule.
    pub fn clear_rule(&self) { self.lock().rule = None; }

    /// Deliver every held frame now.
    pub fn flush(&self) {
        for node in self.lock().nodes.values_mut() {
            node.release_held();
        }
    }

    /// Snapshot of the mesh counters.
    #[must_use]
    pub fn stats(&self) -> MeshStats { self.lock().stats }

    fn lock(&self) -> MutexGuard<'_, MeshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn route(&self, from: NodeId, to: NodeId, frame: Bytes) -> Result<(), SendError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if !state.nodes.contains_key(&to) {
            return Err(SendError::Unreachable(to.to_string()));
        }
        let info = FrameInfo {
            from,
            to,
            index: state.stats.sent,
            message: Message::from_bytes(&frame).ok(),
        };
        state.stats.sent += 1;
        let fate = state.rule.as_mut().map_or(Fate::Deliver, |rule| rule(&info));

        let Some(node) = state.nodes.get_mut(&to) else {
            return Err(SendError::Unreachable(to.to_string()));
        };
        let delivery = Delivery::new(from, frame);
        match fate {
            Fate::Deliver => {
                node.push(delivery);
                node.release_held();
            }
            Fate::Drop => state.stats.dropped += 1,
            Fate::Duplicate => {
                state.stats.duplicated += 1;
                node.push(delivery.clone());
                node.push(delivery);
                node.release_held();
            }
            Fate::Delay => {
                state.stats.delayed += 1;
                node.held.push(delivery);
            }
        }
        Ok(())
    }
}

/// One node's view of a [`MemoryMesh`].
///
/// Streams returned by [`Transport::incoming`] share one queue.
#[derive(Clone)]
pub struct MeshEndpoint {
    id: NodeId,
    mesh: MemoryMesh,
    rx: Arc<AsyncMutex<UnboundedReceiver<Delivery<NodeId>>>>,
}

impl fmt::Debug for MeshEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshEndpoint").field("id", &self.id).finish_non_exhaustive()
    }
}

impl MeshEndpoint {
    /// Address of this endpoint.
    #[must_use]
    pub const fn id(&self) -> NodeId { self.id }
}

#[async_trait]
impl Transport for MeshEndpoint {
    type Peer = NodeId;

    async fn send(&self, peer: &NodeId, frame: Bytes) -> Result<(), SendError> {
        if frame.len() > ENVELOPE_LIMIT {
            return Err(SendError::Oversized {
                size: frame.len(),
                max: ENVELOPE_LIMIT,
            });
        }
        self.mesh.route(self.id, *peer, frame)
    }

    fn incoming(&self) -> Incoming<NodeId> {
        stream::unfold(Arc::clone(&self.rx), |rx| async move {
            let next = rx.lock().await.next().await;
            next.map(|delivery| (delivery, rx))
        })
        .boxed()
    }
}
