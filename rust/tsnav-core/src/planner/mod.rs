//! Route planning over the navigation graph.
//!
//! `calculate_path` runs Dijkstra between prefab placements. Whenever a path
//! passes through a prefab, the lanes inside it must connect the arriving road
//! to the leaving one; [`Planner::set_internal_route_prefab`] checks that with a
//! depth-first search across adjacent prefabs.

mod bridge;
mod dijkstra;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::navigation::NavigationGraph;
use crate::network::RoadNetwork;
use crate::options::PlannerOptions;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("item {0:#X} does not exist")]
    UnknownItem(u64),
    #[error("item {0:#X} is not a prefab placement")]
    NotAPrefab(u64),
    #[error("no path from {start:#X} to {end:#X}")]
    NoPathFound { start: u64, end: u64 },
    #[error("search cancelled")]
    Cancelled,
    #[error("search exceeded {0} expansions")]
    ExpansionLimit(u64),
    #[error("search exceeded {0} ms")]
    Timeout(u64),
}

/// Cooperative cancellation flag shared with a running search.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self { Self::default() }
    pub fn cancel(&self) { self.0.store(true, Ordering::Relaxed) }
    pub fn is_cancelled(&self) -> bool { self.0.load(Ordering::Relaxed) }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FerryCrossing {
    /// Ferry terminal item uids.
    pub from_item: u64,
    pub to_item: u64,
    pub from_port: u64,
    pub to_port: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    pub start: u64,
    pub end: u64,
    pub cost: f32,
    /// Prefab placements visited, start to end.
    pub prefabs: Vec<u64>,
    /// Road items driven, start to end.
    pub roads: Vec<u64>,
    pub ferries: Vec<FerryCrossing>,
    pub expansions: u64,
}

/// The lanes used inside one prefab placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefabLane {
    pub prefab: u64,
    pub entry_node: usize,
    pub exit_node: usize,
    pub curves: Vec<usize>,
    pub length: f32,
}

/// A chain of prefabs connecting two roads that do not touch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bridge {
    /// Total internal length divided by the first road's width.
    pub cost: f32,
    pub length: f32,
    pub lanes: Vec<PrefabLane>,
}

pub struct Planner<'a> {
    network: &'a RoadNetwork,
    graph: &'a NavigationGraph,
    options: PlannerOptions,
    cancel: Option<CancelToken>,
}

impl<'a> Planner<'a> {
    pub fn new(network: &'a RoadNetwork, graph: &'a NavigationGraph, options: PlannerOptions) -> Self {
        Self { network, graph, options, cancel: None }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn options(&self) -> &PlannerOptions { &self.options }
}
