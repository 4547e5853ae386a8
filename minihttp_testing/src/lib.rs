//! Utilities for exercising `minihttp` clients and servers in tests.
//!
//! [`MemoryMesh`] replaces the radio link with an in-memory one whose fault
//! rule can drop, duplicate or delay individual envelopes:
//!
//! ```rust
//! use minihttp_testing::{Fate, MemoryMesh, NodeId};
//!
//! let mesh = MemoryMesh::new();
//! let _server = mesh.endpoint(NodeId(1));
//! let _client = mesh.endpoint(NodeId(2));
//! mesh.set_rule(|frame| match frame.fragment() {
//!     Some(fragment) if fragment.seq.get() == 2 => Fate::Drop,
//!     _ => Fate::Deliver,
//! });
//! ```

pub mod documents;
pub mod logging;
pub mod mesh;
pub mod metrics;

pub use documents::{ascii_document, multibyte_document, path};
pub use logging::{LoggerHandle, logger};
pub use mesh::{Fate, FrameInfo, MemoryMesh, MeshEndpoint, MeshStats, NodeId};
