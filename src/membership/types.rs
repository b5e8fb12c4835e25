use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::str::FromStr;

/// Local time as seen by one node. Only ever compared against other
/// timestamps taken from the same node's clock.
pub type Timestamp = u64;

/// Stable key of a group member, derived from its network address.
///
/// `id` is the IPv4 address read as a big-endian integer and `port` is the
/// transport port. The all-zero identity marks an unused slot and is never
/// admitted into a membership table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeIdentity {
    pub id: u32,
    pub port: u16,
}

impl NodeIdentity {
    pub const NULL: NodeIdentity = NodeIdentity { id: 0, port: 0 };

    pub const fn new(id: u32, port: u16) -> Self {
        Self { id, port }
    }

    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::from(self.id), self.port))
    }
}

impl From<SocketAddrV4> for NodeIdentity {
    fn from(addr: SocketAddrV4) -> Self {
        Self {
            id: u32::from(*addr.ip()),
            port: addr.port(),
        }
    }
}

impl TryFrom<SocketAddr> for NodeIdentity {
    type Error = IdentityParseError;

    fn try_from(addr: SocketAddr) -> Result<Self, Self::Error> {
        match addr {
            SocketAddr::V4(v4) => Ok(v4.into()),
            SocketAddr::V6(v6) => Err(IdentityParseError(v6.to_string())),
        }
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", Ipv4Addr::from(self.id), self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not an IPv4 `address:port` pair")]
pub struct IdentityParseError(pub String);

impl FromStr for NodeIdentity {
    type Err = IdentityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<SocketAddrV4>()
            .map(NodeIdentity::from)
            .map_err(|_| IdentityParseError(s.to_string()))
    }
}

impl TryFrom<String> for NodeIdentity {
    type Error = IdentityParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<NodeIdentity> for String {
    fn from(identity: NodeIdentity) -> Self {
        identity.to_string()
    }
}

/// One row of a membership table.
///
/// `last_updated` is stamped by the node that holds the entry whenever it
/// accepts a new or higher heartbeat. It is never taken from a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipEntry {
    pub identity: NodeIdentity,
    pub heartbeat: u64,
    pub last_updated: Timestamp,
}

impl MembershipEntry {
    pub fn new(identity: NodeIdentity, heartbeat: u64, last_updated: Timestamp) -> Self {
        Self {
            identity,
            heartbeat,
            last_updated,
        }
    }
}

/// The two messages nodes exchange.
///
/// - `JoinRequest`: sent once by a new node to the introducer.
/// - `Gossip`: a full (or partial) table snapshot. Also serves as the reply
///   to a join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    JoinRequest {
        sender: NodeIdentity,
        heartbeat: u64,
    },
    Gossip {
        sender: NodeIdentity,
        heartbeat: u64,
        entries: Vec<MembershipEntry>,
    },
}

impl Message {
    pub fn sender(&self) -> NodeIdentity {
        match self {
            Message::JoinRequest { sender, .. } | Message::Gossip { sender, .. } => *sender,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::JoinRequest { .. } => MessageKind::JoinRequest,
            Message::Gossip { .. } => MessageKind::Gossip,
        }
    }
}

/// Leading tag byte of every encoded message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    JoinRequest = 0,
    Gossip = 1,
}

impl TryFrom<u8> for MessageKind {
    type Error = u8;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(MessageKind::JoinRequest),
            1 => Ok(MessageKind::Gossip),
            other => Err(other),
        }
    }
}

/// Lifecycle of a node's participation in the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    /// Constructed but `start` has not been called.
    Uninitialized,
    /// Join request sent, waiting for the first message from the group.
    Joining,
    /// Participating in gossip and failure detection.
    InGroup,
    /// The introducer could not be reached. Terminal.
    Failed,
    /// Torn down by `shutdown`. Terminal.
    Stopped,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Failed | NodeStatus::Stopped)
    }
}
