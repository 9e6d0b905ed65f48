use indexmap::IndexMap;
use itertools::Itertools;
use tracing::trace;

use crate::models::PrefabItem;
use crate::options::BridgeStrategy;
use crate::prefab::{NodeRole, Placement};

use super::{Bridge, Planner, PrefabLane, Route};

/// One step of a bridging chain: the node crossed to enter `prefab`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hop {
    node: u64,
    prefab: u64,
}

impl Planner<'_> {
    /// Finds a chain of adjacent prefabs whose internal lanes lead from
    /// `start_road` to `end_road`. `None` when no such chain exists within the
    /// configured depth.
    pub fn set_internal_route_prefab(&self, start_road: u64, end_road: u64) -> Option<Bridge> {
        let road = self.network.item(start_road)?.as_road()?;
        self.network.item(end_road)?.as_road()?;
        let width = road.look.as_ref()?.width();
        if width <= 0.0 {
            return None;
        }

        let mut stack: Vec<Vec<Hop>> = Vec::new();
        for node in [road.start_node_uid, road.end_node_uid] {
            if let Some(prefab) = self.seed_prefab(node) {
                stack.push(vec![Hop { node, prefab }]);
            }
        }

        let mut best: Option<Bridge> = None;
        while let Some(path) = stack.pop() {
            let Some(&Hop { prefab: current, .. }) = path.last() else { continue };
            let Some(placement) = self.network.item(current).and_then(|i| i.as_prefab()) else { continue };

            if let Some(exit) = self.node_touching(placement, end_road) {
                if let Some(bridge) = self.evaluate(&path, exit, width) {
                    trace!(start_road, end_road, prefabs = bridge.lanes.len(), length = bridge.length, "bridge found");
                    match self.options.bridge_strategy {
                        BridgeStrategy::FirstMatch => return Some(bridge),
                        BridgeStrategy::Cheapest => {
                            if best.as_ref().map_or(true, |b| bridge.length < b.length) {
                                best = Some(bridge);
                            }
                        }
                    }
                }
                continue;
            }
            if path.len() >= self.options.max_bridge_depth {
                continue;
            }
            for &node in &placement.node_uids {
                for next in self.network.prefabs_at_node(node, current) {
                    if path.iter().any(|h| h.prefab == next) {
                        continue;
                    }
                    let mut extended = path.clone();
                    extended.push(Hop { node, prefab: next });
                    stack.push(extended);
                }
            }
        }
        best
    }

    /// Lanes taken inside every prefab crossed between consecutive roads of `route`.
    pub fn calculate_prefabs_path(&self, route: &Route) -> Vec<PrefabLane> {
        let mut lanes: IndexMap<u64, PrefabLane> = IndexMap::new();
        for (a, b) in route.roads.iter().copied().tuple_windows() {
            if self.roads_share_node(a, b) {
                continue;
            }
            if let Some(bridge) = self.set_internal_route_prefab(a, b) {
                for lane in bridge.lanes {
                    lanes.insert(lane.prefab, lane);
                }
            }
        }
        lanes.into_values().collect()
    }

    /// Prefab on either side of a road end, backward side first.
    fn seed_prefab(&self, node_uid: u64) -> Option<u64> {
        let node = self.network.get_node_by_uid(node_uid)?;
        [node.backward_item, node.forward_item]
            .into_iter()
            .flatten()
            .find(|&uid| self.network.item(uid).map_or(false, |i| i.is_prefab()))
    }

    fn node_touching(&self, placement: &PrefabItem, road: u64) -> Option<u64> {
        placement.node_uids.iter().copied().find(|&uid| {
            self.network
                .get_node_by_uid(uid)
                .map_or(false, |n| n.forward_item == Some(road) || n.backward_item == Some(road))
        })
    }

    fn evaluate(&self, path: &[Hop], exit: u64, width: f32) -> Option<Bridge> {
        let mut lanes = Vec::with_capacity(path.len());
        let mut length = 0.0;
        for (i, hop) in path.iter().enumerate() {
            let leave = path.get(i + 1).map_or(exit, |h| h.node);
            let lane = self.prefab_lane(hop.prefab, hop.node, leave)?;
            length += lane.length;
            lanes.push(lane);
        }
        Some(Bridge { cost: length / width, length, lanes })
    }

    fn prefab_lane(&self, prefab: u64, enter: u64, leave: u64) -> Option<PrefabLane> {
        let placement = self.network.item(prefab)?.as_prefab()?;
        let def = placement.definition.as_deref()?;
        let anchor = self.network.get_node_by_uid(*placement.node_uids.first()?)?;
        let world = Placement::new(def, placement.origin as usize, anchor)?;
        let tol = self.options.node_tolerance;

        let a = self.network.get_node_by_uid(enter)?;
        let b = self.network.get_node_by_uid(leave)?;
        let entry_node = world.nearest_node(a.x, a.z, NodeRole::Entry, tol)?;
        let exit_node = world.nearest_node(b.x, b.z, NodeRole::Exit, tol)?;
        let route = def.route(entry_node, exit_node)?;
        Some(PrefabLane { prefab, entry_node, exit_node, curves: route.curves.clone(), length: route.length })
    }

    fn roads_share_node(&self, a: u64, b: u64) -> bool {
        let ends = |uid| self.network.item(uid).and_then(|i| i.as_road()).map(|r| [r.start_node_uid, r.end_node_uid]);
        match (ends(a), ends(b)) {
            (Some(x), Some(y)) => x.iter().any(|n| y.contains(n)),
            _ => false,
        }
    }
}
