//! Error types for the envelope codec.
//!
//! The taxonomy separates encode-side precondition failures from decode-side
//! rejections of inbound bytes:
//!
//! - [`CodecError::FieldTooLarge`] and [`CodecError::EncodingTooLarge`]: a field or the whole
//!   envelope exceeds its byte budget. Raised before anything reaches the wire.
//! - [`CodecError::MalformedEnvelope`], [`CodecError::InvalidEncoding`] and
//!   [`CodecError::UnknownType`]: inbound bytes that cannot be turned into a
//!   [`Message`](crate::Message). Callers drop the frame and log it.

use std::fmt;

use thiserror::Error;

/// Envelope field named in codec diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    /// The `type` discriminator.
    Type,
    /// The resource path.
    Path,
    /// The one-based fragment number.
    Frag,
    /// The total fragment count.
    OfFrag,
    /// The content chunk.
    Data,
}

impl Field {
    /// JSON key of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Path => "path",
            Self::Frag => "frag",
            Self::OfFrag => "of_frag",
            Self::Data => "data",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Errors raised while encoding or decoding an envelope.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// A field exceeds its budget: bytes for strings, value for counters.
    #[error("field `{field}` exceeds its budget: {actual} > {max}")]
    FieldTooLarge {
        /// Offending field.
        field: Field,
        /// Measured size or value.
        actual: usize,
        /// Budget for the field.
        max: usize,
    },

    /// The serialised envelope exceeds the transport ceiling.
    #[error("encoded envelope is {size} bytes, limit is {max}")]
    EncodingTooLarge {
        /// Encoded size in bytes.
        size: usize,
        /// Transport ceiling in bytes.
        max: usize,
    },

    /// A required field is missing or holds an impossible value.
    #[error("malformed envelope: {reason}")]
    MalformedEnvelope {
        /// Description of the defect.
        reason: String,
    },

    /// The bytes are not UTF-8 or not a well-formed JSON object.
    #[error("invalid envelope encoding: {reason}")]
    InvalidEncoding {
        /// Underlying parser message.
        reason: String,
    },

    /// The `type` discriminator is neither `GET` nor `RESP`.
    #[error("unknown envelope type: {0:?}")]
    UnknownType(String),
}

impl CodecError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(field: Field) -> Self {
        Self::malformed(format!("missing field `{field}`"))
    }

    /// Whether the error is a byte or counter budget violation.
    #[must_use]
    pub fn is_budget_violation(&self) -> bool {
        matches!(
            self,
            Self::FieldTooLarge { .. } | Self::EncodingTooLarge { .. }
        )
    }
}
