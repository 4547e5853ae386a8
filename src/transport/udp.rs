//! UDP datagram link standing in for the mesh radio.

use std::{io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use log::warn;
use tokio::net::{ToSocketAddrs, UdpSocket};

use super::{Delivery, Incoming, SendError, Transport};
use crate::codec::ENVELOPE_LIMIT;

/// Receive buffer size; larger datagrams are truncated and fail to decode.
const RECV_BUFFER: usize = 512;

/// Carries each frame as a single datagram.
#[derive(Clone, Debug)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    /// Bind a socket at `addr`.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the socket cannot be bound.
    pub async fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    /// Address the socket is bound to.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the address cannot be queried.
    pub fn local_addr(&self) -> io::Result<SocketAddr> { self.socket.local_addr() }
}

#[async_trait]
impl Transport for UdpTransport {
    type Peer = SocketAddr;

    async fn send(&self, peer: &SocketAddr, frame: Bytes) -> Result<(), SendError> {
        if frame.len() > ENVELOPE_LIMIT {
            return Err(SendError::Oversized {
                size: frame.len(),
                max: ENVELOPE_LIMIT,
            });
        }
        self.socket.send_to(&frame, peer).await?;
        Ok(())
    }

    fn incoming(&self) -> Incoming<SocketAddr> {
        stream::unfold(Arc::clone(&self.socket), |socket| async move {
            let mut buf = vec![0_u8; RECV_BUFFER];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, peer)) => {
                        buf.truncate(len);
                        return Some((Delivery::new(peer, buf), socket));
                    }
                    Err(error) => warn!("datagram receive failed: error={error}"),
                }
            }
        })
        .boxed()
    }
}
