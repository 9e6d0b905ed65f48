use bitvec::prelude::*;
use indexmap::IndexMap;

use super::definition::{LaneCurve, PrefabNode};

#[derive(Debug, Clone, PartialEq)]
pub struct InternalRoute {
    /// Curve indices from the entry node to the exit node.
    pub curves: Vec<usize>,
    /// Sum of the curves' straight-line spans.
    pub length: f32,
}

/// All-pairs shortest curve chains between distinct prefab nodes.
///
/// Hops are unit weight. Among equal hop counts the lowest curve index is
/// finalised first, so results are stable for a given definition.
pub fn compute_internal_routes(nodes: &[PrefabNode], curves: &[LaneCurve]) -> IndexMap<(usize, usize), InternalRoute> {
    let mut routes = IndexMap::new();
    for entry in nodes {
        for exit in nodes {
            if entry.index == exit.index {
                continue;
            }
            if let Some(path) = shortest_chain(curves, &entry.entry_curves, &exit.exit_curves) {
                let length = path.iter().map(|&c| curves[c].span()).sum();
                routes.insert((entry.index, exit.index), InternalRoute { curves: path, length });
            }
        }
    }
    routes
}

/// Hop-count Dijkstra from any of `sources` to the first finalised curve in `targets`.
pub fn shortest_chain(curves: &[LaneCurve], sources: &[usize], targets: &[usize]) -> Option<Vec<usize>> {
    if sources.is_empty() || targets.is_empty() {
        return None;
    }
    let n = curves.len();
    let mut dist = vec![u32::MAX; n];
    let mut pred: Vec<Option<usize>> = vec![None; n];
    let mut done = bitvec![0; n];
    for &s in sources {
        dist[s] = 0;
    }

    loop {
        let mut best: Option<usize> = None;
        for i in 0..n {
            if !done[i] && dist[i] != u32::MAX && best.map_or(true, |b| dist[i] < dist[b]) {
                best = Some(i);
            }
        }
        let cur = best?;
        done.set(cur, true);
        if targets.contains(&cur) {
            let mut path = vec![cur];
            let mut at = cur;
            while let Some(p) = pred[at] {
                path.push(p);
                at = p;
            }
            path.reverse();
            return Some(path);
        }
        let next_dist = dist[cur] + 1;
        for &nx in &curves[cur].next {
            if !done[nx] && next_dist < dist[nx] {
                dist[nx] = next_dist;
                pred[nx] = Some(cur);
            }
        }
    }
}
