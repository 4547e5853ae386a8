//! Fragmentation and re-assembly of resource content.
//!
//! This module collects the domain types used to move one resource across a
//! message channel whose payload is capped at 200 bytes. Each sub-module
//! focuses on a single concept to keep the code small and easy to audit while
//! still providing a cohesive API at the crate root.

pub mod error;
pub mod fragmenter;
pub mod index;
pub mod reassembler;
pub mod series;

pub use error::{FragmentStatus, FragmentationError, ReassemblyConflict, ReassemblyStatus};
pub use fragmenter::{FragmentBatch, Fragmenter, MAX_CONTENT_LEN, MIN_CHUNK_SIZE};
pub use index::FragmentIndex;
pub use reassembler::{Reassembler, TransferKey};
pub use series::FragmentSeries;
