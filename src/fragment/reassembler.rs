//! Inbound helper that stitches fragments back into complete content.
//!
//! [`Reassembler`] mirrors the outbound [`Fragmenter`](crate::fragment::Fragmenter)
//! by collecting fragments per [`TransferKey`], that is per `(peer, path)`
//! pair. Arrival order does not matter, identical duplicates are ignored, and
//! any inconsistency discards the buffer for that key alone. Buffers that
//! never complete are purged once older than the configured timeout.
//! Completed transfers are remembered for the same period so late duplicates
//! do not open a fresh buffer. The
//! helper is transport-agnostic: the peer type is whatever the transport uses
//! to name senders.

use std::{
    collections::{HashMap, hash_map::Entry},
    fmt,
    hash::Hash,
    time::{Duration, Instant},
};

use log::{debug, warn};

use super::{FragmentIndex, FragmentSeries, FragmentStatus, ReassemblyStatus};
use crate::{ResourcePath, message::Fragment};

/// Identifies one in-flight transfer on the receiving side.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransferKey<P> {
    /// Sender of the fragments.
    pub peer: P,
    /// Resource being transferred.
    pub path: ResourcePath,
}

impl<P> TransferKey<P> {
    /// Construct a key for `peer` and `path`.
    #[must_use]
    pub fn new(peer: P, path: ResourcePath) -> Self { Self { peer, path } }
}

impl<P: fmt::Display> fmt::Display for TransferKey<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.peer, self.path)
    }
}

#[derive(Debug)]
struct PartialTransfer {
    series: FragmentSeries,
    started_at: Instant,
}

#[derive(Debug)]
struct CompletedTransfer {
    series: FragmentSeries,
    completed_at: Instant,
}

/// Stateful fragment re-assembler with timeout-based eviction.
#[derive(Debug)]
pub struct Reassembler<P> {
    timeout: Duration,
    buffers: HashMap<TransferKey<P>, PartialTransfer>,
    completed: HashMap<TransferKey<P>, CompletedTransfer>,
}

impl<P> Reassembler<P>
where
    P: Clone + Eq + Hash + fmt::Debug,
{
    /// Create a re-assembler that evicts incomplete buffers after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            buffers: HashMap::new(),
            completed: HashMap::new(),
        }
    }

    /// Age after which an incomplete buffer is evicted.
    #[must_use]
    pub const fn timeout(&self) -> Duration { self.timeout }

    /// Process a fragment from `peer` using the current time.
    pub fn ingest(&mut self, peer: &P, fragment: Fragment) -> ReassemblyStatus {
        self.ingest_at(peer, fragment, Instant::now())
    }

    /// Process a fragment using an explicit clock reading.
    ///
    /// `now` only stamps newly created buffers and completions; eviction
    /// happens solely in [`evict_expired_at`](Self::evict_expired_at) so
    /// every expiry is reported to the caller.
    ///
    /// A duplicate of a fragment from a recently completed transfer reports
    /// the same [`ReassemblyStatus::Complete`] again without opening a buffer. A
    /// differing fragment for that key starts a new transfer.
    pub fn ingest_at(&mut self, peer: &P, fragment: Fragment, now: Instant) -> ReassemblyStatus {
        let key = TransferKey::new(peer.clone(), fragment.path.clone());
        if let Some(done) = self.completed.get_mut(&key) {
            if let Ok(FragmentStatus::Duplicate) = done.series.accept(&fragment) {
                debug!(
                    "duplicate of completed transfer ignored: peer={peer:?}, path={}, seq={}",
                    fragment.path, fragment.seq
                );
                return ReassemblyStatus::Complete(done.series.content());
            }
            debug!(
                "fragment differs from completed transfer, starting over: peer={peer:?}, path={}",
                fragment.path
            );
            self.completed.remove(&key);
        }

        let mut entry = match self.buffers.entry(key) {
            Entry::Occupied(occupied) => occupied,
            Entry::Vacant(vacant) => {
                debug!(
                    "starting reassembly: peer={peer:?}, path={}, total={}",
                    fragment.path, fragment.total
                );
                vacant.insert_entry(PartialTransfer {
                    series: FragmentSeries::new(fragment.total),
                    started_at: now,
                })
            }
        };

        match entry.get_mut().series.accept(&fragment) {
            Ok(FragmentStatus::Complete) => {
                let (key, partial) = entry.remove_entry();
                debug!(
                    "reassembly complete: peer={peer:?}, path={}, total={}",
                    fragment.path,
                    partial.series.total()
                );
                let content = partial.series.content();
                self.completed.insert(
                    key,
                    CompletedTransfer {
                        series: partial.series,
                        completed_at: now,
                    },
                );
                ReassemblyStatus::Complete(content)
            }
            Ok(status) => {
                let series = &entry.get().series;
                if status == FragmentStatus::Duplicate {
                    debug!(
                        "duplicate fragment ignored: peer={peer:?}, path={}, seq={}",
                        fragment.path, fragment.seq
                    );
                } else {
                    debug!(
                        "fragment {}/{} for {}: have={}, missing={:?}",
                        fragment.seq,
                        series.total(),
                        fragment.path,
                        series.received(),
                        series.missing()
                    );
                }
                ReassemblyStatus::Incomplete {
                    received: series.received(),
                    total: series.total(),
                }
            }
            Err(conflict) => {
                entry.remove();
                warn!(
                    "reassembly conflict, buffer discarded: peer={peer:?}, path={}, \
                     error={conflict}",
                    fragment.path
                );
                ReassemblyStatus::Conflict(conflict)
            }
        }
    }

    /// Remove the buffer for `peer` and `path`, returning whether one existed.
    ///
    /// Any record of a completed transfer for the key is forgotten too.
    pub fn cancel(&mut self, peer: &P, path: &ResourcePath) -> bool {
        let key = TransferKey::new(peer.clone(), path.clone());
        self.completed.remove(&key);
        self.buffers.remove(&key).is_some()
    }

    /// Whether a buffer exists for `peer` and `path`.
    #[must_use]
    pub fn contains(&self, peer: &P, path: &ResourcePath) -> bool {
        self.buffers
            .contains_key(&TransferKey::new(peer.clone(), path.clone()))
    }

    /// Received and total fragment counts for an in-flight transfer.
    #[must_use]
    pub fn progress(&self, peer: &P, path: &ResourcePath) -> Option<(usize, FragmentIndex)> {
        self.buffers
            .get(&TransferKey::new(peer.clone(), path.clone()))
            .map(|partial| (partial.series.received(), partial.series.total()))
    }

    /// Sequence numbers still outstanding for an in-flight transfer.
    #[must_use]
    pub fn missing(&self, peer: &P, path: &ResourcePath) -> Option<Vec<FragmentIndex>> {
        self.buffers
            .get(&TransferKey::new(peer.clone(), path.clone()))
            .map(|partial| partial.series.missing())
    }

    /// Remove buffers that exceeded the timeout using the current time.
    ///
    /// Returns the keys of the evicted transfers.
    pub fn evict_expired(&mut self) -> Vec<TransferKey<P>> { self.evict_expired_at(Instant::now()) }

    /// Remove buffers that exceeded the timeout using an explicit clock
    /// reading.
    ///
    /// Completion records older than the timeout are dropped silently.
    /// Returns the keys of the evicted, never completed transfers.
    pub fn evict_expired_at(&mut self, now: Instant) -> Vec<TransferKey<P>> {
        let mut evicted = Vec::new();
        let timeout = self.timeout;

        self.completed
            .retain(|_, done| now.saturating_duration_since(done.completed_at) < timeout);

        self.buffers.retain(|key, partial| {
            let expired = now.saturating_duration_since(partial.started_at) >= timeout;
            if expired {
                warn!(
                    "evicting stale transfer: peer={:?}, path={}, have={}/{}",
                    key.peer,
                    key.path,
                    partial.series.received(),
                    partial.series.total()
                );
                evicted.push(key.clone());
            }
            !expired
        });

        evicted
    }

    /// Number of transfers currently buffered.
    #[must_use]
    pub fn buffered_len(&self) -> usize { self.buffers.len() }

    /// Number of completed transfers still remembered for duplicate
    /// suppression.
    #[must_use]
    pub fn completed_len(&self) -> usize { self.completed.len() }
}
