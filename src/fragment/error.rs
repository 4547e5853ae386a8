//! Error and status types emitted by the fragmentation layer.
//!
//! Outbound splitting fails with [`FragmentationError`], always before any
//! transmission. Inbound reassembly never fails outright: every fragment
//! resolves to a [`ReassemblyStatus`], with [`ReassemblyStatus::Conflict`]
//! reporting that the buffer for the key was discarded.

use thiserror::Error;

use super::FragmentIndex;

/// Result of feeding a fragment into a [`FragmentSeries`](crate::fragment::FragmentSeries).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FragmentStatus {
    /// The fragment filled a new slot; more are expected.
    Incomplete,
    /// The fragment repeated an already recorded slot with identical data.
    Duplicate,
    /// The fragment filled the last empty slot.
    Complete,
}

/// Reasons a transfer's buffer was discarded.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyConflict {
    /// The fragment declares a different total than the buffer recorded.
    #[error("fragment count mismatch: expected {expected}, found {found}")]
    TotalMismatch {
        /// Total recorded from the first fragment.
        expected: FragmentIndex,
        /// Total declared by the offending fragment.
        found: FragmentIndex,
    },
    /// The same sequence number arrived twice with different data.
    #[error("fragment {seq} arrived twice with different data")]
    DataMismatch {
        /// Sequence number of the conflicting fragment.
        seq: FragmentIndex,
    },
    /// The sequence number lies beyond the declared total.
    #[error("fragment {seq} lies beyond total {total}")]
    SequenceOutOfRange {
        /// Offending sequence number.
        seq: FragmentIndex,
        /// Declared total.
        total: FragmentIndex,
    },
}

/// Outcome of [`Reassembler::ingest`](crate::fragment::Reassembler::ingest).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReassemblyStatus {
    /// More fragments are needed.
    Incomplete {
        /// Distinct fragments recorded so far.
        received: usize,
        /// Fragments in the transfer.
        total: FragmentIndex,
    },
    /// Every fragment arrived; carries the reconstructed content.
    Complete(Vec<u8>),
    /// The buffer for the key was discarded; a fresh request is required.
    Conflict(ReassemblyConflict),
}

impl ReassemblyStatus {
    /// Whether the status ends the transfer, successfully or not.
    #[must_use]
    pub fn is_terminal(&self) -> bool { !matches!(self, Self::Incomplete { .. }) }
}

/// Errors produced while fragmenting outbound content.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FragmentationError {
    /// The path exceeds the wire budget.
    #[error("path {path:?} is {len} bytes, budget is {max}")]
    PathTooLong {
        /// The rejected path.
        path: String,
        /// Encoded length of the path.
        len: usize,
        /// Path budget.
        max: usize,
    },
    /// The content needs more fragments than the counters can express.
    #[error("content of {len} bytes needs more than {max_fragments} fragments")]
    ContentTooLarge {
        /// Content length in bytes.
        len: usize,
        /// Fragment ceiling.
        max_fragments: usize,
    },
    /// The content is not valid UTF-8, so it cannot travel as text fragments.
    #[error("content is not valid UTF-8 after byte {valid_up_to}")]
    InvalidUtf8 {
        /// Length of the longest valid prefix.
        valid_up_to: usize,
    },
}
