use super::Transport;
use crate::membership::error::TransportError;
use crate::membership::types::NodeIdentity;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;

/// Largest datagram the receive loop accepts.
pub const MAX_DATAGRAM: usize = 65536;

/// Datagram transport over a shared, non-blocking tokio socket.
#[derive(Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
}

impl UdpTransport {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn socket(&self) -> Arc<UdpSocket> {
        self.socket.clone()
    }
}

impl Transport for UdpTransport {
    fn send(&self, _from: NodeIdentity, to: NodeIdentity, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > MAX_DATAGRAM {
            return Err(TransportError::PayloadTooLarge {
                len: payload.len(),
                max: MAX_DATAGRAM,
            });
        }
        self.socket.try_send_to(payload, to.socket_addr())?;
        Ok(())
    }
}
