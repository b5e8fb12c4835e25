//! Transport Module
//!
//! The unreliable point-to-point channel the membership protocol runs over.
//! Sends are fire-and-forget: success only means the payload left this node.
//!
//! ## Implementations
//! - **`emulated`**: In-process network shared by many simulated nodes, with
//!   configurable message loss and per-node traffic counters.
//! - **`udp`**: Real datagrams through a non-blocking tokio socket.

pub mod emulated;
pub mod udp;

use crate::membership::codec;
use crate::membership::error::TransportError;
use crate::membership::types::{Message, NodeIdentity};

pub use emulated::{EmulatedNetwork, NetworkConfig, TrafficStats};
pub use udp::UdpTransport;

pub trait Transport: Send + Sync {
    /// Hands `payload` to the network for delivery to `to`. Never blocks.
    fn send(&self, from: NodeIdentity, to: NodeIdentity, payload: &[u8]) -> Result<(), TransportError>;

    fn send_message(&self, from: NodeIdentity, to: NodeIdentity, message: &Message) -> Result<(), TransportError> {
        let encoded = codec::encode(message);
        self.send(from, to, &encoded)
    }
}

#[cfg(test)]
mod tests;
