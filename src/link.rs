//! Glue between messages and the transport shared by both drivers.

use bytes::Bytes;
use log::warn;
use thiserror::Error;

use crate::{
    codec::{self, CodecError},
    hooks::TransferHooks,
    message::Message,
    metrics::{self, Direction},
    transport::{Delivery, SendError, Transport},
};

/// Failure to put a message on the link.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub(crate) enum OutboundError {
    #[error(transparent)]
    Encode(#[from] CodecError),
    #[error(transparent)]
    Send(#[from] SendError),
}

/// Encode, seal and send one message.
pub(crate) async fn send<T: Transport>(
    transport: &T,
    hooks: &dyn TransferHooks,
    peer: &T::Peer,
    message: &Message,
) -> Result<(), OutboundError> {
    let mut frame = codec::encode(message)?;
    hooks.seal(&mut frame);
    transport.send(peer, Bytes::from(frame)).await?;
    metrics::inc_envelopes(Direction::Outbound);
    Ok(())
}

/// Open and decode one delivery.
///
/// Frames rejected by the hooks or the codec are logged, counted and
/// dropped; they never reach session state.
pub(crate) fn receive<P: std::fmt::Display>(
    hooks: &dyn TransferHooks,
    delivery: &Delivery<P>,
) -> Option<Message> {
    let mut frame = delivery.frame.to_vec();
    if !hooks.open(&mut frame) {
        warn!("frame rejected by hooks: peer={}", delivery.peer);
        metrics::inc_dropped();
        return None;
    }
    match codec::decode(&frame) {
        Ok(message) => {
            metrics::inc_envelopes(Direction::Inbound);
            Some(message)
        }
        Err(error) => {
            warn!("dropping undecodable frame: peer={}, error={error}", delivery.peer);
            metrics::inc_dropped();
            None
        }
    }
}
