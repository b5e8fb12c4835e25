//! Simulation Module
//!
//! Drives a whole group of nodes inside one process over an `EmulatedNetwork`
//! and a shared `LogicalClock`. Each `step` is one global round in which every
//! live node drains its inbox and ticks once, followed by one clock advance.
//!
//! Node `i` (1-based) gets identity `0.0.0.i:0`; node 1 is the introducer.

use crate::membership::clock::{Clock, LogicalClock};
use crate::membership::config::MembershipConfig;
use crate::membership::runtime::NodeRuntime;
use crate::membership::types::{NodeIdentity, NodeStatus};
use crate::transport::{EmulatedNetwork, NetworkConfig, TrafficStats};

use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub nodes: usize,
    pub membership: MembershipConfig,
    pub network: NetworkConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            nodes: 3,
            membership: MembershipConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

struct SimNode {
    runtime: NodeRuntime<EmulatedNetwork>,
    crashed: bool,
}

pub struct Simulation {
    network: Arc<EmulatedNetwork>,
    clock: Arc<LogicalClock>,
    nodes: BTreeMap<NodeIdentity, SimNode>,
    round: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        if config.nodes == 0 {
            bail!("a simulation needs at least one node");
        }

        let mut membership = config.membership;
        membership.introducer = Self::identity_of(1);
        membership.validate()?;

        let network = Arc::new(EmulatedNetwork::new(config.network));
        let clock = Arc::new(LogicalClock::new());

        let nodes = (1..=config.nodes)
            .map(|i| {
                let identity = Self::identity_of(i);
                let clock: Arc<dyn Clock> = clock.clone();
                let runtime = NodeRuntime::new(identity, &membership, network.clone(), clock);
                (
                    identity,
                    SimNode {
                        runtime,
                        crashed: false,
                    },
                )
            })
            .collect();

        Ok(Self {
            network,
            clock,
            nodes,
            round: 0,
        })
    }

    /// Identity of the `i`-th node, counting from 1.
    pub fn identity_of(i: usize) -> NodeIdentity {
        NodeIdentity::new(i as u32, 0)
    }

    pub fn identities(&self) -> Vec<NodeIdentity> {
        self.nodes.keys().copied().collect()
    }

    /// Attaches the node to the network and runs its join.
    ///
    /// A join failure is not an error here; the node is left `Failed`.
    pub fn start_node(&mut self, identity: NodeIdentity) -> Result<NodeStatus> {
        let node = self
            .nodes
            .get_mut(&identity)
            .ok_or_else(|| anyhow!("unknown node {}", identity))?;

        self.network.attach(identity);
        if let Err(e) = node.runtime.start() {
            tracing::warn!("Node {} failed to start: {}", identity, e);
        }
        Ok(node.runtime.status())
    }

    pub fn start_all(&mut self) -> Result<()> {
        for identity in self.identities() {
            self.start_node(identity)?;
        }
        Ok(())
    }

    /// One global round.
    pub fn step(&mut self) {
        for (identity, node) in self.nodes.iter_mut() {
            if node.crashed || node.runtime.status().is_terminal() {
                continue;
            }
            for payload in self.network.receive(*identity) {
                node.runtime.enqueue(payload);
            }
            node.runtime.run_cycle();
        }
        self.clock.advance();
        self.round += 1;
    }

    pub fn run(&mut self, rounds: u64) {
        for _ in 0..rounds {
            self.step();
        }
    }

    /// Stops a node dead: it no longer runs and nothing reaches it.
    pub fn crash(&mut self, identity: NodeIdentity) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&identity)
            .ok_or_else(|| anyhow!("unknown node {}", identity))?;
        node.crashed = true;
        self.network.detach(identity);
        tracing::info!("Node {} crashed at round {}", identity, self.round);
        Ok(())
    }

    /// Gracefully tears a node down and takes it off the network.
    pub fn shutdown(&mut self, identity: NodeIdentity) -> Result<()> {
        let node = self
            .nodes
            .get_mut(&identity)
            .ok_or_else(|| anyhow!("unknown node {}", identity))?;
        node.runtime.shutdown();
        self.network.detach(identity);
        Ok(())
    }

    pub fn runtime(&self, identity: &NodeIdentity) -> Option<&NodeRuntime<EmulatedNetwork>> {
        self.nodes.get(identity).map(|node| &node.runtime)
    }

    /// Nodes that are running and in the group.
    pub fn live_identities(&self) -> Vec<NodeIdentity> {
        self.nodes
            .iter()
            .filter(|(_, node)| !node.crashed && node.runtime.status() == NodeStatus::InGroup)
            .map(|(identity, _)| *identity)
            .collect()
    }

    /// True when every live node's table holds exactly the live nodes.
    pub fn is_converged(&self) -> bool {
        let live = self.live_identities();
        live.iter().all(|identity| {
            self.runtime(identity).is_some_and(|runtime| {
                let mut known: Vec<NodeIdentity> =
                    runtime.members().iter().map(|entry| entry.identity).collect();
                known.sort();
                known == live
            })
        })
    }

    pub fn stats(&self, identity: &NodeIdentity) -> TrafficStats {
        self.network.stats(identity)
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn network(&self) -> &EmulatedNetwork {
        &self.network
    }
}

#[cfg(test)]
mod tests;
