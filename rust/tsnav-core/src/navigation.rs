//! Item-level navigation graph between prefab placements.
//!
//! Runs of plain road segments between two prefabs collapse into one edge
//! weighted `Σ(segment length / road width)`. Prefabs that share a node get a
//! zero-cost edge, and ferry ports are attached through the nearest junction.

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{Item, Node};
use crate::network::RoadNetwork;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EdgePath {
    /// The two prefabs touch at a shared node.
    Direct,
    /// Road item uids in travel order.
    Roads { roads: Vec<u64> },
    /// Ferry terminal item uids.
    Ferry { from: u64, to: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavEdge {
    pub cost: f32,
    pub path: EdgePath,
}

impl NavEdge {
    pub fn direct() -> Self { Self { cost: 0.0, path: EdgePath::Direct } }

    pub fn first_road(&self) -> Option<u64> {
        match &self.path { EdgePath::Roads { roads } => roads.first().copied(), _ => None }
    }

    pub fn last_road(&self) -> Option<u64> {
        match &self.path { EdgePath::Roads { roads } => roads.last().copied(), _ => None }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationGraph {
    adjacency: IndexMap<u64, IndexMap<u64, NavEdge>>,
}

struct Walk {
    target: u64,
    cost: f32,
    roads: Vec<u64>,
    /// Set when the walk left the source node through a road's end node.
    against_road: bool,
    bidirectional: bool,
}

impl NavigationGraph {
    pub fn new() -> Self { Self::default() }

    /// Adds `from -> to` unless an edge between the pair already exists.
    pub fn insert(&mut self, from: u64, to: u64, edge: NavEdge) -> bool {
        let out = self.adjacency.entry(from).or_default();
        if out.contains_key(&to) {
            return false;
        }
        out.insert(to, edge);
        true
    }

    pub fn edge(&self, from: u64, to: u64) -> Option<&NavEdge> { self.adjacency.get(&from)?.get(&to) }

    pub fn neighbors(&self, from: u64) -> impl Iterator<Item = (u64, &NavEdge)> {
        self.adjacency.get(&from).into_iter().flat_map(|m| m.iter().map(|(k, v)| (*k, v)))
    }

    pub fn degree(&self, from: u64) -> usize { self.adjacency.get(&from).map_or(0, |m| m.len()) }
    pub fn node_count(&self) -> usize { self.adjacency.len() }
    pub fn edge_count(&self) -> usize { self.adjacency.values().map(|m| m.len()).sum() }

    pub fn build(network: &RoadNetwork) -> Self {
        let mut graph = NavigationGraph::new();
        for prefab in network.prefab_items().filter(|p| p.usable()) {
            let Some(placement) = prefab.as_prefab() else { continue };
            for &node_uid in &placement.node_uids {
                let Some(node) = network.get_node_by_uid(node_uid) else { continue };
                match leaving_road(network, node) {
                    Some(road) => graph.add_road_chain(network, prefab.uid(), node, road),
                    None => graph.add_direct(network, node),
                }
            }
        }
        let road_edges = graph.edge_count();
        graph.add_ferries(network);
        info!(prefabs = graph.node_count(), edges = graph.edge_count(), ferry_edges = graph.edge_count() - road_edges, "navigation graph built");
        graph
    }

    fn add_road_chain(&mut self, network: &RoadNetwork, source: u64, node: &Node, road: u64) {
        let Some(walk) = walk_roads(network, source, node, road) else { return };
        if walk.target == source {
            debug!(prefab = walk.target, roads = walk.roads.len(), "road chain loops back to its prefab");
            return;
        }
        if walk.bidirectional || !walk.against_road {
            self.insert(source, walk.target, NavEdge { cost: walk.cost, path: EdgePath::Roads { roads: walk.roads.clone() } });
        }
        if walk.bidirectional || walk.against_road {
            let mut reversed = walk.roads;
            reversed.reverse();
            self.insert(walk.target, source, NavEdge { cost: walk.cost, path: EdgePath::Roads { roads: reversed } });
        }
    }

    fn add_direct(&mut self, network: &RoadNetwork, node: &Node) {
        let (Some(fwd), Some(bwd)) = (node.forward_item, node.backward_item) else { return };
        let usable_prefab = |uid| network.item(uid).map_or(false, |i: &Item| i.is_prefab() && i.usable());
        if fwd == bwd || !usable_prefab(fwd) || !usable_prefab(bwd) {
            return;
        }
        self.insert(fwd, bwd, NavEdge::direct());
        self.insert(bwd, fwd, NavEdge::direct());
    }

    fn add_ferries(&mut self, network: &RoadNetwork) {
        let mut proxies: IndexMap<u64, u64> = IndexMap::new();
        for port in network.ferry_ports() {
            let Some(terminal) = network.ferry_item_for_port(port) else { continue };
            match self.nearest_junction(network, terminal) {
                Some(prefab) => {
                    proxies.insert(port, prefab);
                }
                None => debug!(port, "no junction near ferry port"),
            }
        }
        for port in network.ferry_ports() {
            for conn in network.lookup_ferry_connections(port) {
                let (Some(&a), Some(&b)) = (proxies.get(&conn.start_port), proxies.get(&conn.end_port)) else { continue };
                let (Some(from), Some(to)) = (network.ferry_item_for_port(conn.start_port), network.ferry_item_for_port(conn.end_port)) else {
                    continue;
                };
                if a == b {
                    continue;
                }
                let cost = conn.distance as f32;
                self.insert(a, b, NavEdge { cost, path: EdgePath::Ferry { from: from.uid(), to: to.uid() } });
                self.insert(b, a, NavEdge { cost, path: EdgePath::Ferry { from: to.uid(), to: from.uid() } });
            }
        }
    }

    /// Closest visible prefab that already joins more than one other prefab.
    fn nearest_junction(&self, network: &RoadNetwork, terminal: &Item) -> Option<u64> {
        let mut best: Option<(u64, f32)> = None;
        for p in network.prefab_items().filter(|p| p.usable() && self.degree(p.uid()) > 1) {
            let d = ((terminal.x() - p.x()).powi(2) + (terminal.z() - p.z()).powi(2)).sqrt();
            if best.map_or(true, |(_, b)| d < b) {
                best = Some((p.uid(), d));
            }
        }
        best.map(|(uid, _)| uid)
    }
}

/// The road leaving a prefab boundary node, forward side first.
fn leaving_road(network: &RoadNetwork, node: &Node) -> Option<u64> {
    [node.forward_item, node.backward_item]
        .into_iter()
        .flatten()
        .find(|&uid| network.item(uid).map_or(false, Item::is_road))
}

/// Follows roads from `node` until the next prefab. `None` when the chain ends anywhere else.
fn walk_roads(network: &RoadNetwork, source: u64, node: &Node, first_road: u64) -> Option<Walk> {
    let against_road = network.item(first_road)?.as_road()?.end_node_uid == node.uid;
    let mut prev_node = node.uid;
    let mut prev_item = source;
    let mut current = first_road;
    let mut roads = Vec::new();
    let mut seen = FxHashSet::default();
    let mut cost = 0.0f32;
    let mut bidirectional = false;

    loop {
        let item = network.item(current)?;
        if item.is_prefab() {
            if !item.usable() {
                return None;
            }
            return Some(Walk { target: current, cost, roads, against_road, bidirectional });
        }
        let road = item.as_road()?;
        if !item.usable() || !seen.insert(current) {
            return None;
        }
        let look = road.look.as_ref()?;
        let width = look.width();
        if width <= 0.0 {
            warn!(road = current, width, "road look has no width");
            return None;
        }
        let a = network.get_node_by_uid(road.start_node_uid)?;
        let b = network.get_node_by_uid(road.end_node_uid)?;
        cost += a.distance_to(b) / width;
        bidirectional = look.is_bidirectional();
        roads.push(current);

        let next_node_uid = if road.start_node_uid == prev_node { road.end_node_uid } else { road.start_node_uid };
        let next = network.get_node_by_uid(next_node_uid)?;
        let next_item = if next.backward_item == Some(current) || next.backward_item == Some(prev_item) {
            next.forward_item
        } else {
            next.backward_item
        };
        prev_node = next_node_uid;
        prev_item = next_item?;
        current = prev_item;
    }
}
