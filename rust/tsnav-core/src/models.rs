use std::sync::Arc;

use serde::Serialize;

use crate::defs::{City, RoadLook};
use crate::prefab::PrefabDefinition;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub uid: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// Heading in radians, within [0, 2π).
    pub rotation: f32,
    pub rotation_vector: [f32; 3],
    pub backward_item_uid: u64,
    pub forward_item_uid: u64,
    /// Resolved after every sector has been decoded.
    pub backward_item: Option<u64>,
    pub forward_item: Option<u64>,
}

impl Node {
    pub fn heading_from_vector(rx: f32, rz: f32) -> f32 {
        let rot = std::f32::consts::PI - rz.atan2(rx);
        rot.rem_euclid(std::f32::consts::TAU)
    }

    pub fn distance_to(&self, other: &Node) -> f32 {
        ((self.x - other.x).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Road,
    Prefab,
    City,
    Ferry,
    MapArea,
}

impl ItemType {
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            3 => Some(Self::Road),
            4 => Some(Self::Prefab),
            12 => Some(Self::City),
            19 => Some(Self::Ferry),
            42 => Some(Self::MapArea),
            _ => None,
        }
    }

    pub fn tag(self) -> u32 {
        match self {
            Self::Road => 3,
            Self::Prefab => 4,
            Self::City => 12,
            Self::Ferry => 19,
            Self::MapArea => 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemHeader {
    pub item_type: ItemType,
    pub uid: u64,
    pub x: f32,
    pub z: f32,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub header: ItemHeader,
    /// False when a shared definition could not be resolved.
    pub valid: bool,
    pub hidden: bool,
    /// Bytes the record occupied in its sector.
    pub block_size: usize,
    pub kind: ItemKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    Road(RoadItem),
    Prefab(PrefabItem),
    City(CityItem),
    Ferry(FerryItem),
    MapArea(MapAreaItem),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadItem {
    pub dlc_guard: u8,
    pub look_token: u64,
    pub look: Option<Arc<RoadLook>>,
    pub start_node_uid: u64,
    pub end_node_uid: u64,
    pub length: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrefabItem {
    pub dlc_guard: u8,
    pub secret: bool,
    pub token: u64,
    pub definition: Option<Arc<PrefabDefinition>>,
    /// Boundary nodes in definition order; the first one anchors the placement.
    pub node_uids: Vec<u64>,
    /// Index into the definition's node list of the node placed on `node_uids[0]`.
    pub origin: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CityItem {
    pub token: u64,
    pub city: Option<Arc<City>>,
    pub width: f32,
    pub height: f32,
    pub node_uid: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FerryItem {
    pub port_token: u64,
    pub prefab_uid: u64,
    pub node_uid: u64,
    pub unload_offset: [f32; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapAreaItem {
    pub draw_over: bool,
    pub node_uids: Vec<u64>,
    pub colour: Option<u32>,
}

impl Item {
    pub fn uid(&self) -> u64 { self.header.uid }
    pub fn item_type(&self) -> ItemType { self.header.item_type }
    pub fn x(&self) -> f32 { self.header.x }
    pub fn z(&self) -> f32 { self.header.z }

    /// Visible and fully resolved.
    pub fn usable(&self) -> bool { self.valid && !self.hidden }

    pub fn as_road(&self) -> Option<&RoadItem> {
        match &self.kind { ItemKind::Road(r) => Some(r), _ => None }
    }

    pub fn as_prefab(&self) -> Option<&PrefabItem> {
        match &self.kind { ItemKind::Prefab(p) => Some(p), _ => None }
    }

    pub fn as_ferry(&self) -> Option<&FerryItem> {
        match &self.kind { ItemKind::Ferry(f) => Some(f), _ => None }
    }

    pub fn is_road(&self) -> bool { self.as_road().is_some() }
    pub fn is_prefab(&self) -> bool { self.as_prefab().is_some() }

    /// Every node uid this item references.
    pub fn node_uids(&self) -> Vec<u64> {
        match &self.kind {
            ItemKind::Road(r) => vec![r.start_node_uid, r.end_node_uid],
            ItemKind::Prefab(p) => p.node_uids.clone(),
            ItemKind::City(c) => vec![c.node_uid],
            ItemKind::Ferry(f) => vec![f.node_uid],
            ItemKind::MapArea(m) => m.node_uids.clone(),
        }
    }

    pub fn touches_node(&self, node_uid: u64) -> bool {
        match &self.kind {
            ItemKind::Road(r) => r.start_node_uid == node_uid || r.end_node_uid == node_uid,
            ItemKind::Prefab(p) => p.node_uids.contains(&node_uid),
            ItemKind::City(c) => c.node_uid == node_uid,
            ItemKind::Ferry(f) => f.node_uid == node_uid,
            ItemKind::MapArea(m) => m.node_uids.contains(&node_uid),
        }
    }
}
