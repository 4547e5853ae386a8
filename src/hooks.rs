//! Optional transform stages around the fragmenter and codec.
//!
//! [`TransferHooks`] is the public interface applications implement;
//! every method has a pass-through default. The hooks never see fragments
//! and cannot change how completeness is detected.

use std::sync::Arc;

use crate::ResourcePath;

/// Verdict of the pre-fragmentation content check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ContentDecision {
    /// Fragment and send the content.
    #[default]
    Send,
    /// The client already holds this content.
    ///
    /// Reserved for cache validation. The server currently logs it and sends
    /// the content anyway.
    NotModified,
}

/// Extension points for cache validation and envelope integrity.
///
/// ```
/// use minihttp::hooks::TransferHooks;
///
/// /// Appends a one-byte checksum to each outbound frame.
/// struct Checksum;
///
/// impl TransferHooks for Checksum {
///     fn seal(&self, frame: &mut Vec<u8>) {
///         let sum = frame.iter().fold(0_u8, |acc, b| acc.wrapping_add(*b));
///         frame.push(sum);
///     }
///
///     fn open(&self, frame: &mut Vec<u8>) -> bool {
///         let Some(sum) = frame.pop() else { return false };
///         frame.iter().fold(0_u8, |acc, b| acc.wrapping_add(*b)) == sum
///     }
/// }
/// ```
pub trait TransferHooks: Send + Sync + 'static {
    /// Inspect content before it is fragmented.
    fn validate_content(&self, _path: &ResourcePath, _content: &[u8]) -> ContentDecision {
        ContentDecision::Send
    }

    /// Transform an encoded envelope before it is sent.
    ///
    /// The sealed frame must still fit the link ceiling or the transport
    /// refuses it.
    fn seal(&self, _frame: &mut Vec<u8>) {}

    /// Reverse [`seal`](Self::seal) on a received frame. Returning `false`
    /// drops the frame.
    fn open(&self, _frame: &mut Vec<u8>) -> bool { true }
}

/// Hooks that change nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHooks;

impl TransferHooks for NoHooks {}

/// Shared handle used by the drivers.
pub type SharedHooks = Arc<dyn TransferHooks>;

/// Handle to [`NoHooks`].
#[must_use]
pub fn no_hooks() -> SharedHooks { Arc::new(NoHooks) }

#[cfg(test)]
mod tests {
    use super::{ContentDecision, NoHooks, TransferHooks};
    use crate::ResourcePath;

    #[test]
    fn defaults_pass_everything_through() {
        let hooks = NoHooks;
        let path = ResourcePath::new("/a").expect("valid path");
        let mut frame = b"{}".to_vec();

        assert_eq!(hooks.validate_content(&path, b"x"), ContentDecision::Send);
        hooks.seal(&mut frame);
        assert!(hooks.open(&mut frame));
        assert_eq!(frame, b"{}");
    }
}
