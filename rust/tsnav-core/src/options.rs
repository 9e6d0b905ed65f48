use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_EXPANSIONS: u64 = 1_000_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_BRIDGE_DEPTH: usize = 8;
/// Distance within which a world node counts as sitting on a prefab's local node.
pub const DEFAULT_NODE_TOLERANCE: f32 = 0.2;

/// How to pick among several prefab chains that bridge two roads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStrategy {
    /// Accept the first chain, in search order, whose every hop has an internal route.
    #[default]
    FirstMatch,
    /// Evaluate every chain and keep the shortest.
    Cheapest,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerOptions {
    /// 0 disables the limit.
    pub max_expansions: u64,
    /// 0 disables the limit.
    pub timeout_ms: u64,
    /// Maximum number of prefabs in one bridging chain.
    pub max_bridge_depth: usize,
    pub bridge_strategy: BridgeStrategy,
    pub node_tolerance: f32,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_bridge_depth: DEFAULT_MAX_BRIDGE_DEPTH,
            bridge_strategy: BridgeStrategy::FirstMatch,
            node_tolerance: DEFAULT_NODE_TOLERANCE,
        }
    }
}

impl PlannerOptions {
    pub fn from_json_file(path: &Path) -> Result<Self, OptionsError> {
        let text = std::fs::read_to_string(path).map_err(|source| OptionsError::Io { path: path.display().to_string(), source })?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    #[error("failed to read options from {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("malformed planner options: {0}")]
    Json(#[from] serde_json::Error),
}
