//! Per-version record layouts for placed map items.
//!
//! Sector files carry one format version for every item they hold. The prefab
//! placement record changed shape six times across the supported range; rather
//! than one decode routine per revision, each generation is described by a
//! [`PrefabLayout`] row and a single walker in `items.rs` follows it.

use super::reader::DecodeError;

pub const MIN_SECTOR_VERSION: i32 = 825;
pub const MAX_SECTOR_VERSION: i32 = 858;

/// Versions from which map areas carry a trailing colour index.
pub const MAP_AREA_COLOUR_SINCE: i32 = 846;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LayoutGeneration {
    V825,
    V829,
    V831,
    V846,
    V854,
    V855,
}

impl LayoutGeneration {
    pub fn for_version(version: i32) -> Result<Self, DecodeError> {
        let generation = match version {
            v if !(MIN_SECTOR_VERSION..=MAX_SECTOR_VERSION).contains(&v) => {
                return Err(DecodeError::UnsupportedVersion(v))
            }
            825..=828 => Self::V825,
            829..=830 => Self::V829,
            831..=845 => Self::V831,
            846..=853 => Self::V846,
            854 => Self::V854,
            _ => Self::V855,
        };
        Ok(generation)
    }

    pub fn prefab(self) -> &'static PrefabLayout {
        &PREFAB_LAYOUTS[self as usize]
    }

    pub fn road(self) -> &'static RoadLayout {
        match self {
            Self::V825 => &ROAD_LEGACY,
            Self::V829 | Self::V831 | Self::V846 => &ROAD_CLASSIC,
            Self::V854 | Self::V855 => &ROAD_MODERN,
        }
    }
}

/// How the boundary node count is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountField {
    /// Full little-endian i32.
    Int32,
    /// Only the low byte of a 4-byte field is meaningful.
    LowByte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VegetationLayout {
    pub record: usize,
    pub padding: usize,
    pub sphere_record: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefabLayout {
    pub generation: LayoutGeneration,
    /// Bytes from the start of the prefab token to the next field (token, look, variant).
    pub look_span: usize,
    pub additional_parts: bool,
    pub node_count: CountField,
    /// Per boundary node.
    pub node_look_size: usize,
    pub vegetation: Option<VegetationLayout>,
    /// Per boundary node, after everything else.
    pub node_trailer: usize,
    pub tail_padding: usize,
    pub secret_flag: bool,
}

pub const PREFAB_FLAGS_OFFSET: usize = 0x34;
pub const PREFAB_DLC_OFFSET: usize = 0x35;
pub const PREFAB_HIDDEN_OFFSET: usize = 0x36;
pub const PREFAB_TOKEN_OFFSET: usize = 0x39;
pub const PREFAB_SECRET_BIT: u8 = 1 << 5;

const VEGETATION_825: VegetationLayout = VegetationLayout { record: 0x20, padding: 0x04, sphere_record: 0x10 };
const VEGETATION_829: VegetationLayout = VegetationLayout { record: 0x20, padding: 0x04, sphere_record: 0x14 };

static PREFAB_LAYOUTS: [PrefabLayout; 6] = [
    PrefabLayout {
        generation: LayoutGeneration::V825,
        look_span: 0x18,
        additional_parts: false,
        node_count: CountField::Int32,
        node_look_size: 0x38,
        vegetation: Some(VEGETATION_825),
        node_trailer: 0,
        tail_padding: 0,
        secret_flag: false,
    },
    PrefabLayout {
        generation: LayoutGeneration::V829,
        look_span: 0x18,
        additional_parts: true,
        node_count: CountField::LowByte,
        node_look_size: 0x38,
        vegetation: Some(VEGETATION_829),
        node_trailer: 0,
        tail_padding: 0,
        secret_flag: false,
    },
    PrefabLayout {
        generation: LayoutGeneration::V831,
        look_span: 0x18,
        additional_parts: true,
        node_count: CountField::LowByte,
        node_look_size: 0x38,
        vegetation: Some(VEGETATION_829),
        node_trailer: 0x18,
        tail_padding: 0,
        secret_flag: false,
    },
    PrefabLayout {
        generation: LayoutGeneration::V846,
        look_span: 0x18,
        additional_parts: true,
        node_count: CountField::LowByte,
        node_look_size: 0x3A,
        vegetation: Some(VEGETATION_829),
        node_trailer: 0x18,
        tail_padding: 0,
        secret_flag: false,
    },
    PrefabLayout {
        generation: LayoutGeneration::V854,
        look_span: 0x10,
        additional_parts: true,
        node_count: CountField::Int32,
        node_look_size: 0x0C,
        vegetation: None,
        node_trailer: 0,
        tail_padding: 0,
        secret_flag: false,
    },
    PrefabLayout {
        generation: LayoutGeneration::V855,
        look_span: 0x10,
        additional_parts: true,
        node_count: CountField::Int32,
        node_look_size: 0x0C,
        vegetation: None,
        node_trailer: 0,
        tail_padding: 0x08,
        secret_flag: true,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoadLayout {
    /// Unknown bytes between the road look token and the start node uid.
    pub gap: usize,
    pub stamp_record: Option<usize>,
    pub sphere_record: Option<usize>,
}

pub const ROAD_DLC_OFFSET: usize = 0x37;
pub const ROAD_HIDDEN_OFFSET: usize = 0x3A;
pub const ROAD_LOOK_OFFSET: usize = 0x3D;

static ROAD_LEGACY: RoadLayout = RoadLayout { gap: 0x50, stamp_record: Some(0x18), sphere_record: Some(0x10) };
static ROAD_CLASSIC: RoadLayout = RoadLayout { gap: 0x50, stamp_record: Some(0x18), sphere_record: Some(0x14) };
static ROAD_MODERN: RoadLayout = RoadLayout { gap: 0xA4, stamp_record: None, sphere_record: None };
