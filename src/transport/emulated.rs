//! Emulated Network
//!
//! Shared in-process network for running many nodes in one process. Each
//! attached node owns a FIFO inbox; messages can be dropped at random to
//! model an unreliable link.

use super::Transport;
use crate::membership::error::TransportError;
use crate::membership::types::NodeIdentity;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Payloads larger than this are refused.
pub const DEFAULT_MAX_PAYLOAD: usize = 4000;
/// Messages an inbox holds before further sends to it fail.
pub const DEFAULT_INBOX_CAPACITY: usize = 30000;

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Probability in `[0, 1]` that a sent message silently vanishes.
    pub drop_probability: f64,
    pub max_payload: usize,
    pub inbox_capacity: usize,
    /// Seed for the loss generator, so lossy runs are reproducible.
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            drop_probability: 0.0,
            max_payload: DEFAULT_MAX_PAYLOAD,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            seed: 0,
        }
    }
}

/// Per-node message counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficStats {
    pub sent: u64,
    pub received: u64,
    pub dropped: u64,
}

pub struct EmulatedNetwork {
    config: NetworkConfig,
    inboxes: DashMap<NodeIdentity, VecDeque<Bytes>>,
    stats: DashMap<NodeIdentity, TrafficStats>,
    rng: Mutex<StdRng>,
}

impl EmulatedNetwork {
    pub fn new(config: NetworkConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            inboxes: DashMap::new(),
            stats: DashMap::new(),
            rng: Mutex::new(rng),
        }
    }

    /// Gives `identity` an inbox. Re-attaching keeps any queued messages.
    pub fn attach(&self, identity: NodeIdentity) {
        self.inboxes.entry(identity).or_default();
        self.stats.entry(identity).or_default();
    }

    /// Removes the inbox of `identity`, discarding whatever it still held.
    pub fn detach(&self, identity: NodeIdentity) {
        if let Some((_, pending)) = self.inboxes.remove(&identity) {
            tracing::debug!("Detached {} with {} undelivered messages", identity, pending.len());
        }
    }

    pub fn is_attached(&self, identity: &NodeIdentity) -> bool {
        self.inboxes.contains_key(identity)
    }

    /// Takes every message currently waiting for `identity`, oldest first.
    pub fn receive(&self, identity: NodeIdentity) -> Vec<Bytes> {
        let drained: Vec<Bytes> = match self.inboxes.get_mut(&identity) {
            Some(mut inbox) => inbox.drain(..).collect(),
            None => return Vec::new(),
        };

        if !drained.is_empty() {
            self.stats.entry(identity).or_default().received += drained.len() as u64;
        }
        drained
    }

    pub fn pending(&self, identity: &NodeIdentity) -> usize {
        self.inboxes.get(identity).map(|inbox| inbox.len()).unwrap_or(0)
    }

    pub fn stats(&self, identity: &NodeIdentity) -> TrafficStats {
        self.stats.get(identity).map(|s| *s).unwrap_or_default()
    }

    fn should_drop(&self) -> bool {
        let p = self.config.drop_probability;
        if p <= 0.0 {
            return false;
        }
        self.rng.lock().gen_bool(p.min(1.0))
    }
}

impl Transport for EmulatedNetwork {
    fn send(&self, from: NodeIdentity, to: NodeIdentity, payload: &[u8]) -> Result<(), TransportError> {
        if payload.len() > self.config.max_payload {
            return Err(TransportError::PayloadTooLarge {
                len: payload.len(),
                max: self.config.max_payload,
            });
        }

        let mut inbox = self
            .inboxes
            .get_mut(&to)
            .ok_or(TransportError::Unreachable(to))?;

        if inbox.len() >= self.config.inbox_capacity {
            return Err(TransportError::InboxFull(to));
        }

        let dropped = self.should_drop();
        if !dropped {
            inbox.push_back(Bytes::copy_from_slice(payload));
        }
        drop(inbox);

        let mut stats = self.stats.entry(from).or_default();
        stats.sent += 1;
        if dropped {
            stats.dropped += 1;
            tracing::trace!("Dropped message {} -> {}", from, to);
        }

        Ok(())
    }
}
