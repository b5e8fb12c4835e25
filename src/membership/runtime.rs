//! Node Runtime
//!
//! Owns one node's protocol state and wires the codec, table, join
//! coordinator and failure detector to a transport. Progress happens only
//! through the two entry points the host calls every cycle: `drain`, then
//! `tick`.

use super::clock::Clock;
use super::codec;
use super::config::MembershipConfig;
use super::detector::{FailureDetector, TickReport};
use super::error::MembershipError;
use super::join::JoinCoordinator;
use super::table::MembershipTable;
use super::types::{MembershipEntry, Message, NodeIdentity, NodeStatus, Timestamp};
use crate::transport::Transport;

use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::Arc;

/// Everything a node knows about the group.
#[derive(Debug, Clone)]
pub struct NodeState {
    pub status: NodeStatus,
    pub table: MembershipTable,
    pub heartbeat: u64,
}

impl NodeState {
    pub fn new() -> Self {
        Self {
            status: NodeStatus::Uninitialized,
            table: MembershipTable::new(),
            heartbeat: 0,
        }
    }
}

impl Default for NodeState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct NodeRuntime<T: Transport + ?Sized> {
    identity: NodeIdentity,
    state: NodeState,
    inbound: VecDeque<Bytes>,
    join: JoinCoordinator,
    detector: FailureDetector,
    transport: Arc<T>,
    clock: Arc<dyn Clock>,
}

impl<T: Transport + ?Sized> NodeRuntime<T> {
    pub fn new(
        identity: NodeIdentity,
        config: &MembershipConfig,
        transport: Arc<T>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identity,
            state: NodeState::new(),
            inbound: VecDeque::new(),
            join: JoinCoordinator::new(config.introducer, config.strict_join_ack),
            detector: FailureDetector::new(config.fail_timeout_ticks, config.gossip_fanout),
            transport,
            clock,
        }
    }

    /// Introduces the node to the group. Fails only when the introducer
    /// cannot be reached, which leaves the node `Failed`.
    pub fn start(&mut self) -> Result<(), MembershipError> {
        let now = self.clock.now();
        self.join
            .start(self.identity, &mut self.state, &*self.transport, now)
    }

    /// Queues a raw datagram for the next `drain`.
    pub fn enqueue(&mut self, payload: Bytes) {
        self.inbound.push_back(payload);
    }

    /// Processes every queued message in arrival order and returns how many
    /// were decoded and handled.
    pub fn drain(&mut self) -> usize {
        if !self.accepts_messages() {
            self.inbound.clear();
            return 0;
        }

        let now = self.clock.now();
        let mut handled = 0;

        while let Some(payload) = self.inbound.pop_front() {
            match codec::decode(&payload, now) {
                Ok(message) => {
                    self.handle(message, now);
                    handled += 1;
                }
                Err(e) if e.is_malformed() => {
                    tracing::warn!("{} dropped {}-byte message: {}", self.identity, payload.len(), e);
                }
                Err(e) => {
                    tracing::debug!("{} ignored message: {}", self.identity, e);
                }
            }
        }

        handled
    }

    /// Runs the gossip loop once. Does nothing unless the node is in the group.
    pub fn tick(&mut self) -> Option<TickReport> {
        if self.state.status != NodeStatus::InGroup {
            return None;
        }

        let now = self.clock.now();
        let report = self
            .detector
            .tick(self.identity, &mut self.state, &*self.transport, now);
        Some(report)
    }

    /// One full node cycle: message drain strictly before the tick.
    pub fn run_cycle(&mut self) -> Option<TickReport> {
        self.drain();
        self.tick()
    }

    /// Tears the node down. Idempotent.
    pub fn shutdown(&mut self) {
        if self.state.status == NodeStatus::Stopped {
            return;
        }
        tracing::info!(
            "{} shutting down ({} members known, heartbeat {})",
            self.identity,
            self.state.table.len(),
            self.state.heartbeat
        );
        self.state.table.clear();
        self.inbound.clear();
        self.state.status = NodeStatus::Stopped;
    }

    fn accepts_messages(&self) -> bool {
        matches!(self.state.status, NodeStatus::Joining | NodeStatus::InGroup)
    }

    fn handle(&mut self, message: Message, now: Timestamp) {
        self.join.confirm(self.identity, &mut self.state, &message);

        if self.state.status != NodeStatus::InGroup {
            return;
        }

        match message {
            Message::JoinRequest { sender, heartbeat } => {
                if let Err(e) = self.join.on_join_request(
                    self.identity,
                    &mut self.state,
                    sender,
                    heartbeat,
                    &*self.transport,
                    now,
                ) {
                    tracing::warn!("{} could not answer join request from {}: {}", self.identity, sender, e);
                }
            }
            Message::Gossip {
                sender, entries, ..
            } => {
                let discovered = self.state.table.merge(&entries, now);
                for peer in discovered {
                    tracing::info!("{} discovered {} via {}", self.identity, peer, sender);
                }
            }
        }
    }

    pub fn identity(&self) -> NodeIdentity {
        self.identity
    }

    pub fn status(&self) -> NodeStatus {
        self.state.status
    }

    pub fn heartbeat(&self) -> u64 {
        self.state.heartbeat
    }

    pub fn state(&self) -> &NodeState {
        &self.state
    }

    pub fn members(&self) -> Vec<MembershipEntry> {
        self.state.table.snapshot()
    }

    pub fn contains(&self, identity: &NodeIdentity) -> bool {
        self.state.table.contains(identity)
    }

    pub fn queued(&self) -> usize {
        self.inbound.len()
    }

    pub fn introducer(&self) -> NodeIdentity {
        self.join.introducer()
    }
}
