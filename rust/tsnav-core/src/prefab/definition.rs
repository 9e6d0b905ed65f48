use indexmap::IndexMap;

use crate::decode::{ByteReader, DecodeError};

use super::routes::{compute_internal_routes, InternalRoute};
use super::PrefabError;

pub const MIN_PREFAB_VERSION: i32 = 0x15;
/// Spawn records grew by four bytes at this version.
pub const SPAWN_V24_VERSION: i32 = 24;

const NODE_RECORD: usize = 0x68;
const CURVE_RECORD: usize = 0x84;
const SPAWN_RECORD: usize = 0x20;
const SPAWN_RECORD_V24: usize = 0x24;
const TRIGGER_RECORD: usize = 0x30;

const NODE_CURVE_SLOTS: usize = 8;
const CURVE_LINK_SLOTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct PrefabNode {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rot_x: f32,
    pub rot_y: f32,
    pub rot_z: f32,
    /// Curves that leave this node into the prefab.
    pub entry_curves: Vec<usize>,
    /// Curves that arrive at this node from inside the prefab.
    pub exit_curves: Vec<usize>,
}

impl PrefabNode {
    pub fn lane_count(&self) -> usize { self.entry_curves.len() + self.exit_curves.len() }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaneCurve {
    pub index: usize,
    pub node_index: i32,
    pub start: [f32; 3],
    pub end: [f32; 3],
    /// Length as stored; routing uses [`LaneCurve::span`].
    pub length: f32,
    pub next: Vec<usize>,
    pub prev: Vec<usize>,
}

impl LaneCurve {
    /// Straight-line distance between the curve's endpoints.
    pub fn span(&self) -> f32 {
        let d: f32 = (0..3).map(|i| (self.start[i] - self.end[i]).powi(2)).sum();
        d.sqrt()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub kind: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerPoint {
    pub id: u32,
    pub action_token: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A decoded prefab descriptor file, shared by every placement of its token.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefabDefinition {
    pub token: u64,
    pub path: String,
    pub category: String,
    pub version: i32,
    pub nodes: Vec<PrefabNode>,
    pub curves: Vec<LaneCurve>,
    pub spawn_points: Vec<SpawnPoint>,
    pub trigger_points: Vec<TriggerPoint>,
    /// (entry node, exit node) -> shortest curve chain. Missing pairs have no route.
    pub routes: IndexMap<(usize, usize), InternalRoute>,
}

struct Header {
    version: i32,
    node_count: usize,
    curve_count: usize,
    spawn_count: usize,
    trigger_count: usize,
    node_offset: usize,
    curve_offset: usize,
    spawn_offset: usize,
    trigger_offset: usize,
}

fn offset(r: &ByteReader<'_>, at: usize) -> Result<usize, DecodeError> {
    let (raw, _) = r.count(at)?;
    Ok(raw)
}

impl Header {
    fn parse(r: &ByteReader<'_>) -> Result<Self, PrefabError> {
        let (version, _) = r.i32(0x00)?;
        if version < MIN_PREFAB_VERSION {
            return Err(PrefabError::VersionTooLow(version));
        }
        let (node_count, _) = r.count(0x04)?;
        let (curve_count, _) = r.count(0x08)?;
        let (spawn_count, _) = r.count(0x14)?;
        let (trigger_count, _) = r.count(0x24)?;
        let p = if version > MIN_PREFAB_VERSION { 0x28 } else { 0x24 };
        Ok(Header {
            version,
            node_count,
            curve_count,
            spawn_count,
            trigger_count,
            node_offset: offset(r, p + 0x08)?,
            curve_offset: offset(r, p + 0x0C)?,
            spawn_offset: offset(r, p + 0x18)?,
            trigger_offset: offset(r, p + 0x2C)?,
        })
    }
}

fn slot_list(r: &ByteReader<'_>, at: usize, slots: usize) -> Result<Vec<i32>, DecodeError> {
    (0..slots).map(|j| r.i32(at + j * 4).map(|(v, _)| v)).collect()
}

fn vec3(r: &ByteReader<'_>, at: usize) -> Result<[f32; 3], DecodeError> {
    Ok([r.f32(at)?.0, r.f32(at + 4)?.0, r.f32(at + 8)?.0])
}

impl PrefabDefinition {
    /// Decodes a descriptor file, validates its curve graph and precomputes internal routes.
    pub fn parse(token: u64, path: &str, category: &str, bytes: &[u8]) -> Result<Self, PrefabError> {
        let r = ByteReader::new(bytes);
        let h = Header::parse(&r)?;

        let mut nodes = Vec::with_capacity(h.node_count.min(bytes.len() / NODE_RECORD));
        for i in 0..h.node_count {
            let base = h.node_offset + i * NODE_RECORD;
            r.skip(base, NODE_RECORD)?;
            let [x, y, z] = vec3(&r, base + 0x10)?;
            let [rot_x, rot_y, rot_z] = vec3(&r, base + 0x1C)?;
            let entry = slot_list(&r, base + 0x28, NODE_CURVE_SLOTS)?;
            let exit = slot_list(&r, base + 0x48, NODE_CURVE_SLOTS)?;
            nodes.push(PrefabNode {
                index: i,
                x,
                y,
                z,
                rot_x,
                rot_y,
                rot_z,
                entry_curves: curve_refs(&entry, h.curve_count, i)?,
                exit_curves: curve_refs(&exit, h.curve_count, i)?,
            });
        }

        let mut curves = Vec::with_capacity(h.curve_count.min(bytes.len() / CURVE_RECORD));
        for i in 0..h.curve_count {
            let base = h.curve_offset + i * CURVE_RECORD;
            r.skip(base, CURVE_RECORD)?;
            let (next_count, _) = r.count(base + 0x6C)?;
            let (prev_count, _) = r.count(base + 0x70)?;
            if next_count > CURVE_LINK_SLOTS || prev_count > CURVE_LINK_SLOTS {
                return Err(PrefabError::TooManyLinks { curve: i, count: next_count.max(prev_count) });
            }
            let next = slot_list(&r, base + 0x4C, next_count)?;
            let prev = slot_list(&r, base + 0x5C, prev_count)?;
            curves.push(LaneCurve {
                index: i,
                node_index: r.i32(base + 0x0C)?.0,
                start: vec3(&r, base + 0x10)?,
                end: vec3(&r, base + 0x1C)?,
                length: r.f32(base + 0x44)?.0,
                next: link_refs(&next, h.curve_count, i)?,
                prev: link_refs(&prev, h.curve_count, i)?,
            });
        }
        check_symmetry(&curves)?;

        let spawn_record = if h.version >= SPAWN_V24_VERSION { SPAWN_RECORD_V24 } else { SPAWN_RECORD };
        let mut spawn_points = Vec::with_capacity(h.spawn_count.min(bytes.len() / spawn_record));
        for i in 0..h.spawn_count {
            let base = h.spawn_offset + i * spawn_record;
            r.skip(base, spawn_record)?;
            let [x, y, z] = vec3(&r, base)?;
            spawn_points.push(SpawnPoint { x, y, z, kind: r.u32(base + 0x1C)?.0 });
        }

        let mut trigger_points = Vec::with_capacity(h.trigger_count.min(bytes.len() / TRIGGER_RECORD));
        for i in 0..h.trigger_count {
            let base = h.trigger_offset + i * TRIGGER_RECORD;
            r.skip(base, TRIGGER_RECORD)?;
            let [x, y, z] = vec3(&r, base + 0x1C)?;
            trigger_points.push(TriggerPoint { id: r.u32(base)?.0, action_token: r.u64(base + 0x04)?.0, x, y, z });
        }

        let routes = compute_internal_routes(&nodes, &curves);
        Ok(PrefabDefinition {
            token,
            path: path.to_string(),
            category: category.to_string(),
            version: h.version,
            nodes,
            curves,
            spawn_points,
            trigger_points,
            routes,
        })
    }

    /// Carries at least one lane curve.
    pub fn is_road(&self) -> bool { !self.curves.is_empty() }

    pub fn route(&self, entry: usize, exit: usize) -> Option<&InternalRoute> {
        self.routes.get(&(entry, exit))
    }
}

/// Node curve slots use -1 for empty.
fn curve_refs(slots: &[i32], curve_count: usize, node: usize) -> Result<Vec<usize>, PrefabError> {
    slots
        .iter()
        .filter(|&&v| v != -1)
        .map(|&v| match usize::try_from(v) {
            Ok(c) if c < curve_count => Ok(c),
            _ => Err(PrefabError::NodeCurveOutOfRange { node, curve: v }),
        })
        .collect()
}

fn link_refs(links: &[i32], curve_count: usize, curve: usize) -> Result<Vec<usize>, PrefabError> {
    links
        .iter()
        .map(|&v| match usize::try_from(v) {
            Ok(c) if c < curve_count => Ok(c),
            _ => Err(PrefabError::CurveLinkOutOfRange { curve, target: v }),
        })
        .collect()
}

/// Every next link must be mirrored by a prev link and vice versa.
pub fn check_symmetry(curves: &[LaneCurve]) -> Result<(), PrefabError> {
    for c in curves {
        if let Some(&j) = c.next.iter().find(|&&j| curves.get(j).map_or(true, |o| !o.prev.contains(&c.index))) {
            return Err(PrefabError::AsymmetricLink { from: c.index, to: j });
        }
        if let Some(&j) = c.prev.iter().find(|&&j| curves.get(j).map_or(true, |o| !o.next.contains(&c.index))) {
            return Err(PrefabError::AsymmetricLink { from: j, to: c.index });
        }
    }
    Ok(())
}
