//! Envelope codec mapping [`Message`] values to and from wire bytes.
//!
//! Each message travels as one JSON object:
//!
//! ```text
//! {"type":"RESP","path":"/index.html","frag":2,"of_frag":4,"data":"..."}
//! ```
//!
//! Field budgets are enforced on the UTF-8 encoded value before encoding and
//! immediately after decoding. Fragmentation never measures serialised size;
//! it relies on the fixed [`DATA_BUDGET`] and leaves the final
//! [`ENVELOPE_LIMIT`] check to [`encode`].
//!
//! Failure replies reuse the `RESP` type with both counters set to zero and a
//! `data` of the form `404: not found`.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::{
    ResourcePath,
    fragment::FragmentIndex,
    message::{ErrorResponse, Fragment, Message, Request, Status},
};

pub mod error;

pub use error::{CodecError, Field};

/// Hard ceiling on a single encoded message.
pub const ENVELOPE_LIMIT: usize = 200;
/// Budget for the `type` discriminator.
pub const TYPE_BUDGET: usize = 4;
/// Budget for the `path` field, leading `/` included.
pub const PATH_BUDGET: usize = 12;
/// Budget for each of the `frag` and `of_frag` fields (two decimal digits).
pub const COUNTER_BUDGET: usize = 2;
/// Budget for a fragment's `data` field.
pub const DATA_BUDGET: usize = 122;
/// Fixed allowance for JSON punctuation and key names.
pub const FRAMING_OVERHEAD: usize = 58;

const _: () = assert!(
    TYPE_BUDGET + PATH_BUDGET + 2 * COUNTER_BUDGET + DATA_BUDGET + FRAMING_OVERHEAD
        == ENVELOPE_LIMIT
);

const REQUEST_TYPE: &str = "GET";
const RESPONSE_TYPE: &str = "RESP";

#[derive(Serialize)]
struct OutboundEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    frag: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    of_frag: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Cow<'a, str>>,
}

#[derive(Deserialize)]
struct InboundEnvelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    path: Option<String>,
    frag: Option<u64>,
    #[serde(alias = "of")]
    of_frag: Option<u64>,
    data: Option<String>,
}

/// Encode `message` into wire bytes.
///
/// # Errors
///
/// Returns [`CodecError::FieldTooLarge`] if the path exceeds [`PATH_BUDGET`]
/// or the data exceeds [`DATA_BUDGET`], [`CodecError::MalformedEnvelope`] if a
/// fragment's `seq` exceeds its `total`, and [`CodecError::EncodingTooLarge`]
/// if the serialised envelope exceeds [`ENVELOPE_LIMIT`].
pub fn encode(message: &Message) -> Result<Vec<u8>, CodecError> {
    check_budget(Field::Path, message.path().encoded_len(), PATH_BUDGET)?;

    let envelope = match message {
        Message::Request(request) => OutboundEnvelope {
            kind: REQUEST_TYPE,
            path: request.path.as_str(),
            frag: request.fragment.map(FragmentIndex::get),
            of_frag: None,
            data: None,
        },
        Message::Fragment(fragment) => {
            if fragment.seq > fragment.total {
                return Err(CodecError::malformed(format!(
                    "fragment {} exceeds total {}",
                    fragment.seq, fragment.total
                )));
            }
            check_budget(Field::Data, fragment.data.len(), DATA_BUDGET)?;
            OutboundEnvelope {
                kind: RESPONSE_TYPE,
                path: fragment.path.as_str(),
                frag: Some(fragment.seq.get()),
                of_frag: Some(fragment.total.get()),
                data: Some(Cow::Borrowed(fragment.data.as_str())),
            }
        }
        Message::Error(response) => {
            let data = response.data();
            check_budget(Field::Data, data.len(), DATA_BUDGET)?;
            OutboundEnvelope {
                kind: RESPONSE_TYPE,
                path: response.path.as_str(),
                frag: Some(0),
                of_frag: Some(0),
                data: Some(Cow::Owned(data)),
            }
        }
    };

    let bytes = serde_json::to_vec(&envelope).map_err(|err| CodecError::InvalidEncoding {
        reason: err.to_string(),
    })?;
    if bytes.len() > ENVELOPE_LIMIT {
        return Err(CodecError::EncodingTooLarge {
            size: bytes.len(),
            max: ENVELOPE_LIMIT,
        });
    }
    Ok(bytes)
}

/// Decode wire bytes into a [`Message`].
///
/// Unknown JSON keys are ignored, `of` is accepted for `of_frag`, and the
/// type discriminator is matched case-insensitively.
///
/// # Errors
///
/// Returns [`CodecError::InvalidEncoding`] for non-UTF-8 or non-JSON input,
/// [`CodecError::UnknownType`] for an unrecognised discriminator,
/// [`CodecError::MalformedEnvelope`] when required fields are missing or
/// inconsistent, and [`CodecError::FieldTooLarge`] or
/// [`CodecError::EncodingTooLarge`] when budgets are exceeded.
pub fn decode(bytes: &[u8]) -> Result<Message, CodecError> {
    if bytes.len() > ENVELOPE_LIMIT {
        return Err(CodecError::EncodingTooLarge {
            size: bytes.len(),
            max: ENVELOPE_LIMIT,
        });
    }
    let text = std::str::from_utf8(bytes).map_err(|err| CodecError::InvalidEncoding {
        reason: err.to_string(),
    })?;
    let mut envelope: InboundEnvelope =
        serde_json::from_str(text).map_err(|err| CodecError::InvalidEncoding {
            reason: err.to_string(),
        })?;

    let kind = envelope
        .kind
        .take()
        .ok_or_else(|| CodecError::missing(Field::Type))?;
    if kind.eq_ignore_ascii_case(REQUEST_TYPE) {
        decode_request(envelope)
    } else if kind.eq_ignore_ascii_case(RESPONSE_TYPE) {
        decode_response(envelope)
    } else {
        Err(CodecError::UnknownType(kind))
    }
}

fn decode_request(envelope: InboundEnvelope) -> Result<Message, CodecError> {
    let path = decode_path(envelope.path)?;
    let fragment = envelope
        .frag
        .map(|frag| decode_counter(Field::Frag, frag))
        .transpose()?;
    Ok(Message::Request(Request { path, fragment }))
}

fn decode_response(envelope: InboundEnvelope) -> Result<Message, CodecError> {
    let path = decode_path(envelope.path)?;
    let frag = envelope.frag.ok_or_else(|| CodecError::missing(Field::Frag))?;
    let of_frag = envelope.of_frag.ok_or_else(|| CodecError::missing(Field::OfFrag))?;
    let data = envelope.data.ok_or_else(|| CodecError::missing(Field::Data))?;
    check_budget(Field::Data, data.len(), DATA_BUDGET)?;

    if frag == 0 && of_frag == 0 {
        return decode_error_response(path, &data);
    }

    let seq = decode_counter(Field::Frag, frag)?;
    let total = decode_counter(Field::OfFrag, of_frag)?;
    if seq > total {
        return Err(CodecError::malformed(format!(
            "fragment {seq} exceeds total {total}"
        )));
    }
    Ok(Message::Fragment(Fragment {
        path,
        seq,
        total,
        data,
    }))
}

fn decode_error_response(path: ResourcePath, data: &str) -> Result<Message, CodecError> {
    let (code, reason) = data
        .split_once(':')
        .ok_or_else(|| CodecError::malformed("failure response lacks a status code"))?;
    let status = code
        .trim()
        .parse::<u16>()
        .ok()
        .and_then(Status::from_code)
        .ok_or_else(|| CodecError::malformed(format!("unknown status code {code:?}")))?;
    Ok(Message::Error(ErrorResponse::new(
        path,
        status,
        reason.trim_start(),
    )))
}

fn decode_path(path: Option<String>) -> Result<ResourcePath, CodecError> {
    let path = path.ok_or_else(|| CodecError::missing(Field::Path))?;
    check_budget(Field::Path, path.len(), PATH_BUDGET)?;
    ResourcePath::new(path).map_err(|err| CodecError::malformed(err.to_string()))
}

fn decode_counter(field: Field, value: u64) -> Result<FragmentIndex, CodecError> {
    if value == 0 {
        return Err(CodecError::malformed(format!("field `{field}` must be at least 1")));
    }
    FragmentIndex::try_from(value).map_err(|actual| CodecError::FieldTooLarge {
        field,
        actual: usize::try_from(actual).unwrap_or(usize::MAX),
        max: usize::from(FragmentIndex::MAX),
    })
}

fn check_budget(field: Field, actual: usize, max: usize) -> Result<(), CodecError> {
    if actual > max {
        return Err(CodecError::FieldTooLarge { field, actual, max });
    }
    Ok(())
}
