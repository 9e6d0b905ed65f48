use std::f32::consts::{FRAC_PI_2, PI};

use crate::models::Node;

use super::PrefabDefinition;

/// Which side of a lane a local node must serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Has at least one curve leaving into the prefab.
    Entry,
    /// Has at least one curve arriving from inside the prefab.
    Exit,
}

/// Places local prefab nodes in world space for one placement.
///
/// The placement is anchored by putting local node `origin` on the world node
/// `anchor` and turning the layout so the two headings agree.
pub struct Placement<'a> {
    def: &'a PrefabDefinition,
    start_x: f32,
    start_z: f32,
    pivot_x: f32,
    pivot_z: f32,
    sin: f32,
    cos: f32,
}

impl<'a> Placement<'a> {
    pub fn new(def: &'a PrefabDefinition, origin: usize, anchor: &Node) -> Option<Self> {
        let o = def.nodes.get(origin)?;
        let angle = anchor.rotation - PI - o.rot_z.atan2(o.rot_x) + FRAC_PI_2;
        Some(Self {
            def,
            start_x: anchor.x - o.x,
            start_z: anchor.z - o.z,
            pivot_x: anchor.x,
            pivot_z: anchor.z,
            sin: angle.sin(),
            cos: angle.cos(),
        })
    }

    /// World (x, z) of local node `index`.
    pub fn world_position(&self, index: usize) -> Option<(f32, f32)> {
        let n = self.def.nodes.get(index)?;
        let dx = self.start_x + n.x - self.pivot_x;
        let dz = self.start_z + n.z - self.pivot_z;
        Some((dx * self.cos - dz * self.sin + self.pivot_x, dx * self.sin + dz * self.cos + self.pivot_z))
    }

    /// Closest local node serving `role` within `tolerance` of the world point.
    pub fn nearest_node(&self, x: f32, z: f32, role: NodeRole, tolerance: f32) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for n in &self.def.nodes {
            let serves = match role {
                NodeRole::Entry => !n.entry_curves.is_empty(),
                NodeRole::Exit => !n.exit_curves.is_empty(),
            };
            if !serves {
                continue;
            }
            let Some((wx, wz)) = self.world_position(n.index) else { continue };
            let d = ((x - wx).powi(2) + (z - wz).powi(2)).sqrt();
            if d < tolerance && best.map_or(true, |(_, b)| d < b) {
                best = Some((n.index, d));
            }
        }
        best.map(|(i, _)| i)
    }
}
