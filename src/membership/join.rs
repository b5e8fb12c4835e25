//! Join Coordinator
//!
//! Gets a node into the group. The introducer bootstraps the group alone;
//! everybody else sends it one join request and waits for the first reply.
//! There is no retry: an unreachable introducer fails the node for good.

use super::error::MembershipError;
use super::runtime::NodeState;
use super::types::{Message, NodeIdentity, NodeStatus, Timestamp};
use crate::membership::error::TransportError;
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct JoinCoordinator {
    introducer: NodeIdentity,
    strict_ack: bool,
}

impl JoinCoordinator {
    pub fn new(introducer: NodeIdentity, strict_ack: bool) -> Self {
        Self {
            introducer,
            strict_ack,
        }
    }

    pub fn introducer(&self) -> NodeIdentity {
        self.introducer
    }

    pub fn start<T: Transport + ?Sized>(
        &self,
        identity: NodeIdentity,
        state: &mut NodeState,
        transport: &T,
        now: Timestamp,
    ) -> Result<(), MembershipError> {
        if state.status != NodeStatus::Uninitialized {
            return Err(MembershipError::InvalidState {
                expected: NodeStatus::Uninitialized,
                actual: state.status,
            });
        }

        state.table.upsert_self(identity, state.heartbeat, now);

        if identity == self.introducer {
            tracing::info!("{} starting up group", identity);
            state.status = NodeStatus::InGroup;
            return Ok(());
        }

        state.status = NodeStatus::Joining;
        let request = Message::JoinRequest {
            sender: identity,
            heartbeat: state.heartbeat,
        };

        match transport.send_message(identity, self.introducer, &request) {
            Ok(()) => {
                tracing::info!("{} trying to join via {}", identity, self.introducer);
                Ok(())
            }
            Err(source) => {
                tracing::error!("{} unable to reach introducer {}: {}", identity, self.introducer, source);
                state.status = NodeStatus::Failed;
                Err(MembershipError::JoinFailure {
                    introducer: self.introducer,
                    source,
                })
            }
        }
    }

    /// Moves a joining node into the group if `message` counts as proof of
    /// membership. Returns `true` on that transition.
    pub fn confirm(&self, identity: NodeIdentity, state: &mut NodeState, message: &Message) -> bool {
        if state.status != NodeStatus::Joining {
            return false;
        }
        if self.strict_ack && !matches!(message, Message::Gossip { .. }) {
            tracing::debug!("{} still joining, ignoring {:?} from {}", identity, message.kind(), message.sender());
            return false;
        }

        tracing::info!("{} joined the group (first message from {})", identity, message.sender());
        state.status = NodeStatus::InGroup;
        true
    }

    /// Admits `sender` into the table and answers with the full table,
    /// which doubles as the joiner's first gossip.
    pub fn on_join_request<T: Transport + ?Sized>(
        &self,
        identity: NodeIdentity,
        state: &mut NodeState,
        sender: NodeIdentity,
        heartbeat: u64,
        transport: &T,
        now: Timestamp,
    ) -> Result<(), TransportError> {
        if state.table.upsert(sender, heartbeat, now) {
            tracing::info!("{} admitted {} (group size {})", identity, sender, state.table.len());
        } else {
            tracing::debug!("{} refreshed {} from repeated join request", identity, sender);
        }

        let reply = Message::Gossip {
            sender: identity,
            heartbeat: state.heartbeat,
            entries: state.table.snapshot(),
        };
        transport.send_message(identity, sender, &reply)
    }
}
