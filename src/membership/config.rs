//! Protocol configuration.
//!
//! Defaults match the classic assignment parameters: a node is evicted after
//! `2 * 10` ticks of heartbeat lag and the introducer lives at `0.0.0.1:0`.

use super::types::NodeIdentity;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_FAIL_TIMEOUT_TICKS: u64 = 10;
pub const DEFAULT_TICK_PERIOD_MS: u64 = 500;
pub const DEFAULT_INTRODUCER: NodeIdentity = NodeIdentity::new(1, 0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipConfig {
    /// Ticks of heartbeat lag that, doubled, get a peer evicted.
    pub fail_timeout_ticks: u64,
    /// Wall-clock interval between protocol ticks.
    pub tick_period_ms: u64,
    /// Well-known contact point for joining nodes.
    pub introducer: NodeIdentity,
    /// Peers gossiped to per tick. `None` pushes to every known peer.
    pub gossip_fanout: Option<usize>,
    /// Only a gossip message confirms a pending join when set.
    pub strict_join_ack: bool,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            fail_timeout_ticks: DEFAULT_FAIL_TIMEOUT_TICKS,
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
            introducer: DEFAULT_INTRODUCER,
            gossip_fanout: None,
            strict_join_ack: false,
        }
    }
}

impl MembershipConfig {
    pub fn with_introducer(introducer: NodeIdentity) -> Self {
        Self {
            introducer,
            ..Self::default()
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Reads a TOML file. Missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: MembershipConfig =
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fail_timeout_ticks == 0 {
            bail!("fail_timeout_ticks must be at least 1");
        }
        if self.tick_period_ms == 0 {
            bail!("tick_period_ms must be at least 1");
        }
        if self.gossip_fanout == Some(0) {
            bail!("gossip_fanout must be at least 1 when set");
        }
        if self.introducer.is_null() {
            bail!("introducer cannot be the null identity");
        }
        Ok(())
    }
}
