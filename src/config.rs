//! Engine configuration.
//!
//! Stored as JSON next to forest snapshots. Every field has a default, so a
//! partial (or empty) file is accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::DEFAULT_SLOW_OP_THRESHOLD_US;

/// Tunables for `TreeEngine`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Run the full invariant checker before every commit. A failing check
    /// rolls the mutation back. O(n log n) per mutation.
    pub verify_invariants: bool,

    /// Collect per-operation metrics.
    pub collect_metrics: bool,

    /// Operations at or above this latency are kept in the slow-op ring.
    pub slow_op_threshold_us: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verify_invariants: false,
            collect_metrics: true,
            slow_op_threshold_us: DEFAULT_SLOW_OP_THRESHOLD_US,
        }
    }
}

impl EngineConfig {
    /// Read config from `path`. Returns None if the file doesn't exist.
    pub fn read_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents)?;
        Ok(Some(config))
    }

    /// Write config to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Config with the runtime invariant check switched on.
    pub fn verifying() -> Self {
        Self {
            verify_invariants: true,
            ..Self::default()
        }
    }
}
