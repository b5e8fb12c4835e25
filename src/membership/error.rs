//! Error taxonomy of the membership protocol.
//!
//! Only `JoinFailure` is fatal for a node. Decode errors and send failures
//! are logged and absorbed by the runtime; gossip repeats every tick.

use super::types::{NodeIdentity, NodeStatus};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("buffer of {len} bytes is shorter than the {min}-byte header")]
    Truncated { len: usize, min: usize },

    #[error("entry region of {len} bytes is not a multiple of {entry_len}")]
    MisalignedEntries { len: usize, entry_len: usize },

    #[error("join request carries {0} unexpected trailing bytes")]
    TrailingBytes(usize),

    #[error("unknown message kind {0}")]
    UnknownKind(u8),
}

impl CodecError {
    /// True when the buffer violates the wire layout. An unknown kind is a
    /// well-formed message this node simply does not speak.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, CodecError::UnknownKind(_))
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("no route to {0}")]
    Unreachable(NodeIdentity),

    #[error("inbox of {0} is full")]
    InboxFull(NodeIdentity),

    #[error("payload of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] CodecError),

    #[error("send failed: {0}")]
    TransportSendFailure(#[from] TransportError),

    #[error("could not reach introducer {introducer}: {source}")]
    JoinFailure {
        introducer: NodeIdentity,
        #[source]
        source: TransportError,
    },

    #[error("node is {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: NodeStatus,
        actual: NodeStatus,
    },
}
