//! Membership Table
//!
//! Per-node map of peer identity to liveness record. Liveness is purely
//! heartbeat driven: merge only ever advances a heartbeat, and eviction
//! compares heartbeats rather than local timestamps.

use super::types::{MembershipEntry, NodeIdentity, Timestamp};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct MembershipTable {
    entries: HashMap<NodeIdentity, MembershipEntry>,
}

impl MembershipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds or refreshes the table's own entry.
    pub fn upsert_self(&mut self, identity: NodeIdentity, heartbeat: u64, now: Timestamp) {
        self.entries
            .entry(identity)
            .and_modify(|entry| {
                entry.heartbeat = entry.heartbeat.max(heartbeat);
                entry.last_updated = now;
            })
            .or_insert_with(|| MembershipEntry::new(identity, heartbeat, now));
    }

    /// Records a peer announced by a join request.
    ///
    /// Returns `true` when the peer was not known before.
    pub fn upsert(&mut self, identity: NodeIdentity, heartbeat: u64, now: Timestamp) -> bool {
        if identity.is_null() {
            return false;
        }

        match self.entries.get_mut(&identity) {
            Some(entry) => {
                entry.heartbeat = entry.heartbeat.max(heartbeat);
                entry.last_updated = now;
                false
            }
            None => {
                self.entries
                    .insert(identity, MembershipEntry::new(identity, heartbeat, now));
                true
            }
        }
    }

    /// Folds a remote view into this one.
    ///
    /// An existing entry adopts the remote heartbeat and is re-stamped with
    /// `now` when `remote >= local`. Unknown identities are inserted, except
    /// the null identity. Returns the identities discovered by this merge.
    pub fn merge(&mut self, remote: &[MembershipEntry], now: Timestamp) -> Vec<NodeIdentity> {
        let mut discovered = Vec::new();

        for incoming in remote {
            match self.entries.get_mut(&incoming.identity) {
                Some(local) => {
                    if incoming.heartbeat >= local.heartbeat {
                        local.heartbeat = incoming.heartbeat;
                        local.last_updated = now;
                    }
                }
                None if incoming.identity.is_null() => {}
                None => {
                    self.entries.insert(
                        incoming.identity,
                        MembershipEntry::new(incoming.identity, incoming.heartbeat, now),
                    );
                    discovered.push(incoming.identity);
                }
            }
        }

        discovered
    }

    /// Removes every entry whose heartbeat lags `self_heartbeat` by at least
    /// `2 * fail_timeout_ticks`, returning the evicted identities.
    pub fn evict_stale(&mut self, self_heartbeat: u64, fail_timeout_ticks: u64) -> Vec<NodeIdentity> {
        let bound = fail_timeout_ticks.saturating_mul(2);
        let mut evicted = Vec::new();

        self.entries.retain(|identity, entry| {
            let stale = self_heartbeat.saturating_sub(entry.heartbeat) >= bound;
            if stale {
                evicted.push(*identity);
            }
            !stale
        });

        evicted.sort();
        evicted
    }

    /// Copy of every entry, self included, ordered by identity.
    pub fn snapshot(&self) -> Vec<MembershipEntry> {
        let mut entries: Vec<MembershipEntry> = self.entries.values().copied().collect();
        entries.sort_by_key(|entry| entry.identity);
        entries
    }

    pub fn get(&self, identity: &NodeIdentity) -> Option<&MembershipEntry> {
        self.entries.get(identity)
    }

    pub fn contains(&self, identity: &NodeIdentity) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn identities(&self) -> impl Iterator<Item = &NodeIdentity> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
