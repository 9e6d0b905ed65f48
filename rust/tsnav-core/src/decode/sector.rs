use tracing::debug;

use crate::models::{Item, Node};

use super::items::{decode_item, DefinitionResolver, ItemContext};
use super::layout::LayoutGeneration;
use super::reader::{ByteReader, DecodeError};

pub const SECTOR_ITEM_COUNT_OFFSET: usize = 0x10;
pub const SECTOR_ITEMS_OFFSET: usize = 0x14;
pub const NODE_RECORD_SIZE: usize = 0x34;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SectorError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unknown item type {tag} at offset {offset:#x}")]
    UnknownItemType { tag: u32, offset: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSector {
    pub path: String,
    pub version: i32,
    pub items: Vec<Item>,
    pub nodes: Vec<Node>,
}

pub fn decode_node(r: &ByteReader<'_>, at: usize) -> Result<Node, DecodeError> {
    r.skip(at, NODE_RECORD_SIZE)?;
    let (uid, _) = r.u64(at)?;
    let (x, _) = r.fixed(at + 0x08)?;
    let (y, _) = r.fixed(at + 0x0C)?;
    let (z, _) = r.fixed(at + 0x10)?;
    let (rx, _) = r.f32(at + 0x14)?;
    let (ry, _) = r.f32(at + 0x18)?;
    let (rz, _) = r.f32(at + 0x1C)?;
    let (backward_item_uid, _) = r.u64(at + 0x24)?;
    let (forward_item_uid, _) = r.u64(at + 0x2C)?;
    Ok(Node {
        uid,
        x,
        y,
        z,
        rotation: Node::heading_from_vector(rx, rz),
        rotation_vector: [rx, ry, rz],
        backward_item_uid,
        forward_item_uid,
        backward_item: None,
        forward_item: None,
    })
}

/// Decodes one sector file. Any failure discards the whole sector, since later
/// record offsets depend on every earlier block size.
pub fn decode_sector(path: &str, bytes: &[u8], resolver: &dyn DefinitionResolver) -> Result<DecodedSector, SectorError> {
    let r = ByteReader::new(bytes);
    let (version, _) = r.i32(0)?;
    let generation = LayoutGeneration::for_version(version)?;
    let ctx = ItemContext { sector: path, version, generation, resolver };

    let (item_count, _) = r.u32(SECTOR_ITEM_COUNT_OFFSET)?;
    let mut items = Vec::with_capacity((item_count as usize).min(bytes.len() / 0x34));
    let mut at = SECTOR_ITEMS_OFFSET;
    for _ in 0..item_count {
        let item = decode_item(&r, at, &ctx)?;
        at += item.block_size;
        items.push(item);
    }

    let (node_count, mut at) = r.u32(at)?;
    let mut nodes = Vec::with_capacity((node_count as usize).min(bytes.len() / NODE_RECORD_SIZE));
    for _ in 0..node_count {
        nodes.push(decode_node(&r, at)?);
        at += NODE_RECORD_SIZE;
    }
    debug!(sector = path, version, items = items.len(), nodes = nodes.len(), "sector decoded");
    Ok(DecodedSector { path: path.to_string(), version, items, nodes })
}
