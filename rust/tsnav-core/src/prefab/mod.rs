mod definition;
mod placement;
mod registry;
mod routes;

pub use definition::{check_symmetry, LaneCurve, PrefabDefinition, PrefabNode, SpawnPoint, TriggerPoint, MIN_PREFAB_VERSION};
pub use placement::{NodeRole, Placement};
pub use registry::PrefabRegistry;
pub use routes::{compute_internal_routes, shortest_chain, InternalRoute};

use crate::decode::DecodeError;

/// Where a prefab token's descriptor file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefabDescriptor {
    pub token: u64,
    pub path: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrefabError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("prefab file version {0} is below the minimum {MIN_PREFAB_VERSION}")]
    VersionTooLow(i32),
    #[error("curve {curve} lists {count} links, at most 4 fit")]
    TooManyLinks { curve: usize, count: usize },
    #[error("node {node} references curve {curve} which does not exist")]
    NodeCurveOutOfRange { node: usize, curve: i32 },
    #[error("curve {curve} links to curve {target} which does not exist")]
    CurveLinkOutOfRange { curve: usize, target: i32 },
    #[error("curve {from} lists {to} as next but {to} does not list {from} as previous")]
    AsymmetricLink { from: usize, to: usize },
}
