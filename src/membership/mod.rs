//! Membership & Failure Detection Module
//!
//! Implements a heartbeat-gossip membership protocol. Every node keeps its own
//! table of peers, pushes that table to the group once per tick, and evicts
//! peers whose heartbeat stops advancing.
//!
//! ## Core Mechanisms
//! - **Join**: A new node sends one join request to a well-known introducer and
//!   receives the introducer's table in return.
//! - **Gossip**: Full-table anti-entropy push to every known peer (or a random
//!   subset) per tick.
//! - **Merge**: Per identity, the higher heartbeat wins; ties refresh the local
//!   timestamp. Duplicated or reordered gossip is harmless.
//! - **Eviction**: A peer lagging `2 * fail_timeout_ticks` heartbeats behind the
//!   local node is removed.

pub mod clock;
pub mod codec;
pub mod config;
pub mod detector;
pub mod error;
pub mod join;
pub mod runtime;
pub mod service;
pub mod table;
pub mod types;

pub use config::MembershipConfig;
pub use error::{CodecError, MembershipError, TransportError};
pub use runtime::{NodeRuntime, NodeState};
pub use types::{MembershipEntry, Message, NodeIdentity, NodeStatus, Timestamp};
