#![allow(dead_code)]

use std::sync::Arc;

use byteorder::{LittleEndian, WriteBytesExt};
use tsnav_core::decode::DecodedSector;
use tsnav_core::defs::{Definitions, RoadLook};
use tsnav_core::models::{FerryItem, Item, ItemHeader, ItemKind, ItemType, Node, PrefabItem, RoadItem};
use tsnav_core::prefab::{compute_internal_routes, LaneCurve, PrefabDefinition, PrefabNode};
use tsnav_core::RoadNetwork;

pub const TWO_WAY: u64 = 0x10;
pub const ONE_WAY: u64 = 0x11;
pub const PREFAB_LEN: f32 = 10.0;
pub const ROAD_LEN: f32 = 40.0;

pub fn two_way_look() -> RoadLook {
    RoadLook::new(TWO_WAY, vec!["traffic_lane.road.local".into()], vec!["traffic_lane.road.local".into()], 0.0)
}

pub fn one_way_look() -> RoadLook {
    RoadLook::new(ONE_WAY, Vec::new(), vec!["traffic_lane.road.local".into()], 0.0)
}

fn local_node(index: usize, x: f32, z: f32, entry: Vec<usize>, exit: Vec<usize>) -> PrefabNode {
    // rotation (0, 0, 1) lines up with world nodes whose vector is (1, 0, 0)
    PrefabNode { index, x, y: 0.0, z, rot_x: 0.0, rot_y: 0.0, rot_z: 1.0, entry_curves: entry, exit_curves: exit }
}

fn lane(index: usize, start: [f32; 3], end: [f32; 3]) -> LaneCurve {
    let length = (0..3).map(|i| (start[i] - end[i]).powi(2)).sum::<f32>().sqrt();
    LaneCurve { index, node_index: 0, start, end, length, next: Vec::new(), prev: Vec::new() }
}

fn definition(token: u64, nodes: Vec<PrefabNode>, curves: Vec<LaneCurve>) -> Arc<PrefabDefinition> {
    let routes = compute_internal_routes(&nodes, &curves);
    Arc::new(PrefabDefinition {
        token,
        path: format!("prefab/{token:x}.ppd"),
        category: String::new(),
        version: 0x16,
        nodes,
        curves,
        spawn_points: Vec::new(),
        trigger_points: Vec::new(),
        routes,
    })
}

/// Two nodes 10 apart on the local x axis with one lane each way.
pub fn straight_prefab() -> Arc<PrefabDefinition> {
    definition(
        0x100,
        vec![local_node(0, 0.0, 0.0, vec![0], vec![1]), local_node(1, PREFAB_LEN, 0.0, vec![1], vec![0])],
        vec![lane(0, [0.0; 3], [PREFAB_LEN, 0.0, 0.0]), lane(1, [PREFAB_LEN, 0.0, 0.0], [0.0; 3])],
    )
}

/// Same footprint as [`straight_prefab`] but only drivable from node 1 to node 0.
pub fn reverse_only_prefab() -> Arc<PrefabDefinition> {
    definition(
        0x101,
        vec![local_node(0, 0.0, 0.0, vec![], vec![0]), local_node(1, PREFAB_LEN, 0.0, vec![0], vec![])],
        vec![lane(0, [PREFAB_LEN, 0.0, 0.0], [0.0; 3])],
    )
}

pub struct Line {
    pub prefabs: Vec<u64>,
    pub roads: Vec<u64>,
    /// (entry, exit) node uids of each prefab.
    pub ends: Vec<(u64, u64)>,
}

/// Builds networks straight from items and nodes, bypassing the byte decoder.
pub struct NetBuilder {
    next_uid: u64,
    nodes: Vec<Node>,
    items: Vec<Item>,
    pub defs: Definitions,
}

impl Default for NetBuilder {
    fn default() -> Self { Self::new() }
}

impl NetBuilder {
    pub fn new() -> Self {
        let mut defs = Definitions::default();
        defs.add_road_look(two_way_look());
        defs.add_road_look(one_way_look());
        Self { next_uid: 1, nodes: Vec::new(), items: Vec::new(), defs }
    }

    fn uid(&mut self) -> u64 {
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    pub fn node(&mut self, x: f32, z: f32) -> u64 {
        let uid = self.uid();
        self.nodes.push(Node {
            uid,
            x,
            y: 0.0,
            z,
            rotation: Node::heading_from_vector(1.0, 0.0),
            rotation_vector: [1.0, 0.0, 0.0],
            backward_item_uid: 0,
            forward_item_uid: 0,
            backward_item: None,
            forward_item: None,
        });
        uid
    }

    fn node_mut(&mut self, uid: u64) -> &mut Node {
        self.nodes.iter_mut().find(|n| n.uid == uid).expect("node exists")
    }

    fn position(&self, uid: u64) -> (f32, f32) {
        let n = self.nodes.iter().find(|n| n.uid == uid).expect("node exists");
        (n.x, n.z)
    }

    pub fn link(&mut self, node: u64, backward: u64, forward: u64) {
        let n = self.node_mut(node);
        if backward != 0 {
            n.backward_item_uid = backward;
        }
        if forward != 0 {
            n.forward_item_uid = forward;
        }
    }

    fn header(item_type: ItemType, uid: u64, x: f32, z: f32) -> ItemHeader {
        ItemHeader { item_type, uid, x, z, flags: 0 }
    }

    pub fn prefab(&mut self, def: &Arc<PrefabDefinition>, nodes: Vec<u64>) -> u64 {
        let uid = self.uid();
        let (x, z) = self.position(nodes[0]);
        self.items.push(Item {
            header: Self::header(ItemType::Prefab, uid, x, z),
            valid: true,
            hidden: false,
            block_size: 0,
            kind: ItemKind::Prefab(PrefabItem {
                dlc_guard: 0,
                secret: false,
                token: def.token,
                definition: Some(def.clone()),
                node_uids: nodes,
                origin: 0,
            }),
        });
        uid
    }

    pub fn road(&mut self, look: u64, start: u64, end: u64) -> u64 {
        let uid = self.uid();
        let (x, z) = self.position(start);
        let look_def = self.defs.road_looks.get(&look).cloned();
        self.items.push(Item {
            header: Self::header(ItemType::Road, uid, x, z),
            valid: look_def.is_some(),
            hidden: false,
            block_size: 0,
            kind: ItemKind::Road(RoadItem { dlc_guard: 0, look_token: look, look: look_def, start_node_uid: start, end_node_uid: end, length: 0.0 }),
        });
        uid
    }

    pub fn ferry(&mut self, port: u64, x: f32, z: f32) -> u64 {
        let uid = self.uid();
        self.items.push(Item {
            header: Self::header(ItemType::Ferry, uid, x, z),
            valid: true,
            hidden: false,
            block_size: 0,
            kind: ItemKind::Ferry(FerryItem { port_token: port, prefab_uid: 0, node_uid: 0, unload_offset: [0.0; 3] }),
        });
        uid
    }

    pub fn hide(&mut self, uid: u64) {
        if let Some(item) = self.items.iter_mut().find(|i| i.uid() == uid) {
            item.hidden = true;
        }
    }

    /// Prefabs left to right along `z`, joined by roads of length [`ROAD_LEN`].
    pub fn line(&mut self, x0: f32, z: f32, defs: &[Arc<PrefabDefinition>], look: u64) -> Line {
        let mut line = Line { prefabs: Vec::new(), roads: Vec::new(), ends: Vec::new() };
        let mut x = x0;
        let mut prev_exit: Option<u64> = None;
        for def in defs {
            let a = self.node(x, z);
            let b = self.node(x + PREFAB_LEN, z);
            let p = self.prefab(def, vec![a, b]);
            self.link(a, 0, p);
            self.link(b, p, 0);
            if let Some(prev) = prev_exit {
                let r = self.road(look, prev, a);
                self.link(prev, 0, r);
                self.link(a, r, 0);
                line.roads.push(r);
            }
            line.prefabs.push(p);
            line.ends.push((a, b));
            prev_exit = Some(b);
            x += PREFAB_LEN + ROAD_LEN;
        }
        line
    }

    pub fn build(self) -> RoadNetwork {
        let sector = DecodedSector { path: "map/test.base".into(), version: 858, items: self.items, nodes: self.nodes };
        RoadNetwork::from_sectors(vec![sector], self.defs).0
    }
}

/// Little-endian record writers for sector and prefab files.
pub mod bytes {
    use super::*;

    pub const CITY_SIZE: usize = 0x51;
    pub const FERRY_SIZE: usize = 0x5D;

    pub fn header(tag: u32, uid: u64, x: f32, z: f32) -> Vec<u8> {
        let mut b = Vec::new();
        b.write_u32::<LittleEndian>(tag).unwrap();
        b.write_u64::<LittleEndian>(uid).unwrap();
        b.write_f32::<LittleEndian>(x).unwrap();
        b.write_f32::<LittleEndian>(0.0).unwrap();
        b.write_f32::<LittleEndian>(z).unwrap();
        b.resize(0x39, 0);
        b
    }

    pub fn road(version: i32, uid: u64, look: u64, start: u64, end: u64, hidden: bool) -> Vec<u8> {
        let mut b = header(3, uid, 0.0, 0.0);
        b.resize(0x3D, 0);
        if hidden {
            b[0x3A] = 0x02;
        }
        b.write_u64::<LittleEndian>(look).unwrap();
        let gap = if version >= 854 { 0xA4 } else { 0x50 };
        b.resize(b.len() + gap, 0);
        b.write_u64::<LittleEndian>(start).unwrap();
        b.write_u64::<LittleEndian>(end).unwrap();
        b.write_f32::<LittleEndian>(ROAD_LEN).unwrap();
        if version < 854 {
            let sphere = if version >= 829 { 0x14 } else { 0x10 };
            b.write_i32::<LittleEndian>(1).unwrap();
            b.resize(b.len() + 0x18, 0);
            b.write_i32::<LittleEndian>(2).unwrap();
            b.resize(b.len() + 2 * sphere, 0);
        }
        b
    }

    pub struct PrefabRecord {
        pub uid: u64,
        pub token: u64,
        pub nodes: Vec<u64>,
        pub origin: u8,
        pub hidden: bool,
        pub secret: bool,
        pub x: f32,
        pub z: f32,
    }

    pub fn prefab(version: i32, p: &PrefabRecord) -> Vec<u8> {
        let mut b = header(4, p.uid, p.x, p.z);
        b[0x34] = if p.secret { 1 << 5 } else { 0 };
        b[0x36] = if p.hidden { 0x02 } else { 0 };
        b.write_u64::<LittleEndian>(p.token).unwrap();
        let look_span = if version >= 854 { 0x10 } else { 0x18 };
        b.resize(0x39 + look_span, 0xAA);
        if version >= 829 {
            b.write_i32::<LittleEndian>(1).unwrap();
            b.write_u64::<LittleEndian>(0xDEAD).unwrap();
        }
        let n = p.nodes.len();
        if (829..854).contains(&version) {
            b.write_u8(n as u8).unwrap();
            b.extend_from_slice(&[0x7F, 0x7F, 0x7F]);
        } else {
            b.write_i32::<LittleEndian>(n as i32).unwrap();
        }
        for &uid in &p.nodes {
            b.write_u64::<LittleEndian>(uid).unwrap();
        }
        b.write_i32::<LittleEndian>(0).unwrap();
        b.resize(b.len() + 8, 0);
        b.write_u8(p.origin).unwrap();
        b.write_u8(0).unwrap();
        let node_look = match version {
            v if v >= 854 => 0x0C,
            v if v >= 846 => 0x3A,
            _ => 0x38,
        };
        b.resize(b.len() + n * node_look, 0);
        if version < 854 {
            b.write_i32::<LittleEndian>(1).unwrap();
            b.resize(b.len() + 0x20 + 4, 0);
            let sphere = if version >= 829 { 0x14 } else { 0x10 };
            b.write_i32::<LittleEndian>(1).unwrap();
            b.resize(b.len() + sphere, 0);
        }
        if (831..854).contains(&version) {
            b.resize(b.len() + n * 0x18, 0);
        }
        if version >= 855 {
            b.resize(b.len() + 8, 0);
        }
        b
    }

    pub fn city(uid: u64, token: u64, node: u64) -> Vec<u8> {
        let mut b = header(12, uid, 0.0, 0.0);
        b.write_u64::<LittleEndian>(token).unwrap();
        b.write_f32::<LittleEndian>(100.0).unwrap();
        b.write_f32::<LittleEndian>(50.0).unwrap();
        b.write_u64::<LittleEndian>(node).unwrap();
        assert_eq!(b.len(), CITY_SIZE);
        b
    }

    pub fn ferry(uid: u64, port: u64, x: f32, z: f32) -> Vec<u8> {
        let mut b = header(19, uid, x, z);
        b.write_u64::<LittleEndian>(port).unwrap();
        b.write_u64::<LittleEndian>(0).unwrap();
        b.write_u64::<LittleEndian>(0).unwrap();
        for v in [1.0f32, 2.0, 3.0] {
            b.write_f32::<LittleEndian>(v).unwrap();
        }
        assert_eq!(b.len(), FERRY_SIZE);
        b
    }

    pub fn map_area(version: i32, uid: u64, nodes: &[u64]) -> Vec<u8> {
        let mut b = header(42, uid, 0.0, 0.0);
        b[0x34] = 1;
        b.write_i32::<LittleEndian>(nodes.len() as i32).unwrap();
        for &n in nodes {
            b.write_u64::<LittleEndian>(n).unwrap();
        }
        if version >= 846 {
            b.write_u32::<LittleEndian>(3).unwrap();
        }
        b
    }

    pub struct NodeRecord {
        pub uid: u64,
        pub x: f32,
        pub z: f32,
        pub backward: u64,
        pub forward: u64,
    }

    pub fn node(n: &NodeRecord) -> Vec<u8> {
        let mut b = Vec::new();
        b.write_u64::<LittleEndian>(n.uid).unwrap();
        b.write_i32::<LittleEndian>((n.x * 256.0) as i32).unwrap();
        b.write_i32::<LittleEndian>(0).unwrap();
        b.write_i32::<LittleEndian>((n.z * 256.0) as i32).unwrap();
        for v in [1.0f32, 0.0, 0.0] {
            b.write_f32::<LittleEndian>(v).unwrap();
        }
        b.resize(0x24, 0);
        b.write_u64::<LittleEndian>(n.backward).unwrap();
        b.write_u64::<LittleEndian>(n.forward).unwrap();
        assert_eq!(b.len(), 0x34);
        b
    }

    pub fn sector(version: i32, items: &[Vec<u8>], nodes: &[NodeRecord]) -> Vec<u8> {
        let mut b = Vec::new();
        b.write_i32::<LittleEndian>(version).unwrap();
        b.resize(0x10, 0);
        b.write_u32::<LittleEndian>(items.len() as u32).unwrap();
        for item in items {
            b.extend_from_slice(item);
        }
        b.write_u32::<LittleEndian>(nodes.len() as u32).unwrap();
        for n in nodes {
            b.extend_from_slice(&node(n));
        }
        b
    }

    pub struct FileNode {
        pub x: f32,
        pub z: f32,
        pub entry: Vec<i32>,
        pub exit: Vec<i32>,
    }

    pub struct FileCurve {
        pub start: [f32; 3],
        pub end: [f32; 3],
        pub next: Vec<i32>,
        pub prev: Vec<i32>,
    }

    const FILE_DATA_START: usize = 0x60;

    /// A descriptor file at version 0x16 with no spawn or trigger points.
    pub fn prefab_file(version: i32, nodes: &[FileNode], curves: &[FileCurve]) -> Vec<u8> {
        let node_offset = FILE_DATA_START;
        let curve_offset = node_offset + nodes.len() * 0x68;
        let end = curve_offset + curves.len() * 0x84;
        let p = if version > 0x15 { 0x28 } else { 0x24 };

        let mut b = vec![0u8; end];
        let put_i32 = |b: &mut Vec<u8>, at: usize, v: i32| b[at..at + 4].copy_from_slice(&v.to_le_bytes());
        put_i32(&mut b, 0x00, version);
        put_i32(&mut b, 0x04, nodes.len() as i32);
        put_i32(&mut b, 0x08, curves.len() as i32);
        put_i32(&mut b, p + 0x08, node_offset as i32);
        put_i32(&mut b, p + 0x0C, curve_offset as i32);
        put_i32(&mut b, p + 0x18, end as i32);
        put_i32(&mut b, p + 0x2C, end as i32);
        let put_f32 = |b: &mut Vec<u8>, at: usize, v: f32| b[at..at + 4].copy_from_slice(&v.to_le_bytes());

        for (i, n) in nodes.iter().enumerate() {
            let base = node_offset + i * 0x68;
            put_f32(&mut b, base + 0x10, n.x);
            put_f32(&mut b, base + 0x18, n.z);
            put_f32(&mut b, base + 0x24, 1.0);
            for slot in 0..8 {
                put_i32(&mut b, base + 0x28 + slot * 4, n.entry.get(slot).copied().unwrap_or(-1));
                put_i32(&mut b, base + 0x48 + slot * 4, n.exit.get(slot).copied().unwrap_or(-1));
            }
        }
        for (i, c) in curves.iter().enumerate() {
            let base = curve_offset + i * 0x84;
            for k in 0..3 {
                put_f32(&mut b, base + 0x10 + k * 4, c.start[k]);
                put_f32(&mut b, base + 0x1C + k * 4, c.end[k]);
            }
            for (slot, &v) in c.next.iter().enumerate().take(4) {
                put_i32(&mut b, base + 0x4C + slot * 4, v);
            }
            for (slot, &v) in c.prev.iter().enumerate().take(4) {
                put_i32(&mut b, base + 0x5C + slot * 4, v);
            }
            put_i32(&mut b, base + 0x6C, c.next.len() as i32);
            put_i32(&mut b, base + 0x70, c.prev.len() as i32);
        }
        b
    }

    /// File form of [`super::straight_prefab`].
    pub fn straight_prefab_file() -> Vec<u8> {
        prefab_file(
            0x16,
            &[
                FileNode { x: 0.0, z: 0.0, entry: vec![0], exit: vec![1] },
                FileNode { x: PREFAB_LEN, z: 0.0, entry: vec![1], exit: vec![0] },
            ],
            &[
                FileCurve { start: [0.0; 3], end: [PREFAB_LEN, 0.0, 0.0], next: vec![], prev: vec![] },
                FileCurve { start: [PREFAB_LEN, 0.0, 0.0], end: [0.0; 3], next: vec![], prev: vec![] },
            ],
        )
    }
}
