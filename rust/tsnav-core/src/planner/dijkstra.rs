use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::navigation::{EdgePath, NavEdge};

use super::{FerryCrossing, PlanError, Planner, Route};

#[derive(Copy, Clone, Debug)]
struct QueueState {
    cost: f32,
    uid: u64,
    seq: u64,
}

impl Ord for QueueState {
    fn cmp(&self, other: &Self) -> Ordering {
        // min-heap on cost, FIFO among equal costs
        other.cost.total_cmp(&self.cost).then_with(|| other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for QueueState { fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) } }
impl PartialEq for QueueState { fn eq(&self, other: &Self) -> bool { self.cmp(other) == Ordering::Equal } }
impl Eq for QueueState {}

enum Crossing {
    /// No road arrives at or leaves from the prefab, nothing to check.
    Free,
    Bridged(f32),
    Blocked,
}

type BridgeMemo = FxHashMap<(u64, u64), Option<f32>>;

impl Planner<'_> {
    fn check_prefab(&self, uid: u64) -> Result<(), PlanError> {
        let item = self.network.item(uid).ok_or(PlanError::UnknownItem(uid))?;
        if !item.is_prefab() {
            return Err(PlanError::NotAPrefab(uid));
        }
        Ok(())
    }

    fn check_guards(&self, expansions: u64, started: &Instant) -> Result<(), PlanError> {
        if self.cancel.as_ref().map_or(false, |c| c.is_cancelled()) {
            return Err(PlanError::Cancelled);
        }
        let o = &self.options;
        if o.max_expansions > 0 && expansions >= o.max_expansions {
            return Err(PlanError::ExpansionLimit(o.max_expansions));
        }
        if o.timeout_ms > 0 && started.elapsed().as_millis() > o.timeout_ms as u128 {
            return Err(PlanError::Timeout(o.timeout_ms));
        }
        Ok(())
    }

    /// Lowest-cost path between two prefab placements.
    pub fn calculate_path(&self, start: u64, end: u64) -> Result<Route, PlanError> {
        self.check_prefab(start)?;
        self.check_prefab(end)?;
        if start == end {
            return Ok(Route { start, end, cost: 0.0, prefabs: vec![start], roads: Vec::new(), ferries: Vec::new(), expansions: 0 });
        }
        if self.graph.degree(start) == 0 {
            debug!(start, "start prefab has no navigation edges");
            return Err(PlanError::NoPathFound { start, end });
        }

        let started = Instant::now();
        let mut dist: FxHashMap<u64, f32> = FxHashMap::default();
        let mut pred: FxHashMap<u64, u64> = FxHashMap::default();
        let mut done: FxHashSet<u64> = FxHashSet::default();
        let mut memo = BridgeMemo::default();
        let mut open = BinaryHeap::new();
        let mut seq: u64 = 0;
        let mut expansions: u64 = 0;
        let mut found = false;

        dist.insert(start, 0.0);
        open.push(QueueState { cost: 0.0, uid: start, seq });

        while let Some(st) = open.pop() {
            self.check_guards(expansions, &started)?;
            if done.contains(&st.uid) || st.cost > dist.get(&st.uid).copied().unwrap_or(f32::INFINITY) {
                continue;
            }
            done.insert(st.uid);
            expansions += 1;
            if st.uid == end {
                found = true;
                break;
            }
            for (to, edge) in self.graph.neighbors(st.uid) {
                if done.contains(&to) {
                    continue;
                }
                let mut weight = st.cost + edge.cost;
                match self.crossing(st.uid, edge, &pred, &mut memo) {
                    Crossing::Free => {}
                    Crossing::Bridged(c) => weight += c,
                    Crossing::Blocked => continue,
                }
                if weight < dist.get(&to).copied().unwrap_or(f32::INFINITY) {
                    dist.insert(to, weight);
                    pred.insert(to, st.uid);
                    seq = seq.wrapping_add(1);
                    open.push(QueueState { cost: weight, uid: to, seq });
                }
            }
        }

        if !found {
            debug!(start, end, expansions, "end prefab unreachable");
            return Err(PlanError::NoPathFound { start, end });
        }
        let route = self.reconstruct(start, end, dist.get(&end).copied().unwrap_or(0.0), &pred, expansions);
        info!(
            start,
            end,
            cost = route.cost,
            prefabs = route.prefabs.len(),
            roads = route.roads.len(),
            ferries = route.ferries.len(),
            expansions,
            bridges = memo.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "route planned"
        );
        Ok(route)
    }

    fn crossing(&self, current: u64, edge: &NavEdge, pred: &FxHashMap<u64, u64>, memo: &mut BridgeMemo) -> Crossing {
        let Some(next_road) = edge.first_road() else { return Crossing::Free };
        let Some(prev_road) = self.arriving_road(current, pred) else { return Crossing::Free };
        let cost = *memo
            .entry((prev_road, next_road))
            .or_insert_with(|| self.set_internal_route_prefab(prev_road, next_road).map(|b| b.cost));
        match cost {
            Some(c) => Crossing::Bridged(c),
            None => {
                debug!(prefab = current, from_road = prev_road, to_road = next_road, "no lane through prefab, edge skipped");
                Crossing::Blocked
            }
        }
    }

    /// Last road driven before reaching `current`, looking back across direct links.
    fn arriving_road(&self, current: u64, pred: &FxHashMap<u64, u64>) -> Option<u64> {
        let mut cur = current;
        while let Some(&p) = pred.get(&cur) {
            match &self.graph.edge(p, cur)?.path {
                EdgePath::Direct => cur = p,
                EdgePath::Roads { roads } => return roads.last().copied(),
                EdgePath::Ferry { .. } => return None,
            }
        }
        None
    }

    fn reconstruct(&self, start: u64, end: u64, cost: f32, pred: &FxHashMap<u64, u64>, expansions: u64) -> Route {
        let mut prefabs = vec![end];
        let mut roads = Vec::new();
        let mut ferries: Vec<FerryCrossing> = Vec::new();
        let mut cur = end;
        while let Some(&p) = pred.get(&cur) {
            if let Some(edge) = self.graph.edge(p, cur) {
                match &edge.path {
                    EdgePath::Direct => {}
                    EdgePath::Roads { roads: r } => roads.extend(r.iter().rev().copied()),
                    EdgePath::Ferry { from, to } => {
                        if !ferries.iter().any(|f| f.from_item == *from) {
                            let port = |uid: u64| self.network.item(uid).and_then(|i| i.as_ferry()).map_or(0, |f| f.port_token);
                            ferries.push(FerryCrossing { from_item: *from, to_item: *to, from_port: port(*from), to_port: port(*to) });
                        }
                    }
                }
            }
            prefabs.push(p);
            cur = p;
        }
        prefabs.reverse();
        roads.reverse();
        ferries.reverse();
        Route { start, end, cost, prefabs, roads, ferries, expansions }
    }
}
