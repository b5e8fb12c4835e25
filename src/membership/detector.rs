//! Failure Detector / Gossip Loop
//!
//! One tick, in order: bump the local heartbeat, evict peers whose heartbeat
//! lags by `2 * fail_timeout_ticks` or more, push the table to the remaining
//! peers. Send failures are counted and otherwise ignored.

use super::runtime::NodeState;
use super::types::{Message, NodeIdentity, Timestamp};
use crate::transport::Transport;

use rand::seq::SliceRandom;

/// What a single tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub heartbeat: u64,
    pub evicted: Vec<NodeIdentity>,
    pub gossip_sent: usize,
    pub send_failures: usize,
}

#[derive(Debug, Clone)]
pub struct FailureDetector {
    fail_timeout_ticks: u64,
    fanout: Option<usize>,
}

impl FailureDetector {
    pub fn new(fail_timeout_ticks: u64, fanout: Option<usize>) -> Self {
        Self {
            fail_timeout_ticks,
            fanout,
        }
    }

    pub fn tick<T: Transport + ?Sized>(
        &self,
        identity: NodeIdentity,
        state: &mut NodeState,
        transport: &T,
        now: Timestamp,
    ) -> TickReport {
        state.heartbeat += 1;
        let heartbeat = state.heartbeat;
        state.table.upsert_self(identity, heartbeat, now);

        let evicted = state.table.evict_stale(heartbeat, self.fail_timeout_ticks);
        for peer in &evicted {
            tracing::info!("{} evicted {} at heartbeat {}", identity, peer, heartbeat);
        }

        let targets = self.select_targets(identity, state);
        let message = Message::Gossip {
            sender: identity,
            heartbeat,
            entries: state.table.snapshot(),
        };

        let mut report = TickReport {
            heartbeat,
            evicted,
            ..TickReport::default()
        };

        for target in targets {
            match transport.send_message(identity, target, &message) {
                Ok(()) => report.gossip_sent += 1,
                Err(e) => {
                    tracing::debug!("Gossip {} -> {} not sent: {}", identity, target, e);
                    report.send_failures += 1;
                }
            }
        }

        report
    }

    fn select_targets(&self, identity: NodeIdentity, state: &NodeState) -> Vec<NodeIdentity> {
        let mut peers: Vec<NodeIdentity> = state
            .table
            .identities()
            .filter(|peer| **peer != identity)
            .copied()
            .collect();
        peers.sort();

        match self.fanout {
            Some(k) if k < peers.len() => peers
                .choose_multiple(&mut rand::thread_rng(), k)
                .copied()
                .collect(),
            _ => peers,
        }
    }
}
