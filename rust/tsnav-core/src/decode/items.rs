use std::sync::Arc;

use tracing::warn;

use crate::defs::{City, RoadLook};
use crate::models::{CityItem, FerryItem, Item, ItemHeader, ItemKind, ItemType, MapAreaItem, PrefabItem, RoadItem};
use crate::prefab::PrefabDefinition;
use crate::token::TokenDisplay;

use super::layout::*;
use super::reader::{ByteReader, DecodeError};
use super::sector::SectorError;

/// Token lookups needed while decoding items.
pub trait DefinitionResolver {
    fn prefab(&self, token: u64) -> Option<Arc<PrefabDefinition>>;
    fn road_look(&self, token: u64) -> Option<Arc<RoadLook>>;
    fn city(&self, token: u64) -> Option<Arc<City>>;
}

pub struct ItemContext<'a> {
    pub sector: &'a str,
    pub version: i32,
    pub generation: LayoutGeneration,
    pub resolver: &'a dyn DefinitionResolver,
}

const CITY_BLOCK_SIZE: usize = 0x51;
const FERRY_BLOCK_SIZE: usize = 0x5D;
const SHARED_TOKEN_OFFSET: usize = 0x39;

pub fn decode_header(r: &ByteReader<'_>, start: usize) -> Result<ItemHeader, SectorError> {
    let (tag, _) = r.u32(start)?;
    let item_type = ItemType::from_tag(tag).ok_or(SectorError::UnknownItemType { tag, offset: start })?;
    Ok(ItemHeader {
        item_type,
        uid: r.u64(start + 0x04)?.0,
        x: r.f32(start + 0x0C)?.0,
        z: r.f32(start + 0x14)?.0,
        flags: r.u32(start + 0x34)?.0,
    })
}

/// Decodes the item record at `start`. `block_size` on the result locates the next record.
pub fn decode_item(r: &ByteReader<'_>, start: usize, ctx: &ItemContext<'_>) -> Result<Item, SectorError> {
    let header = decode_header(r, start)?;
    let item = match header.item_type {
        ItemType::Road => decode_road(r, start, header, ctx)?,
        ItemType::Prefab => decode_prefab(r, start, header, ctx)?,
        ItemType::City => decode_city(r, start, header, ctx)?,
        ItemType::Ferry => decode_ferry(r, start, header)?,
        ItemType::MapArea => decode_map_area(r, start, header, ctx)?,
    };
    Ok(item)
}

fn decode_road(r: &ByteReader<'_>, start: usize, header: ItemHeader, ctx: &ItemContext<'_>) -> Result<Item, DecodeError> {
    let layout = ctx.generation.road();
    let (dlc_guard, _) = r.u8(start + ROAD_DLC_OFFSET)?;
    let hidden = r.u8(start + ROAD_HIDDEN_OFFSET)?.0 & 0x02 != 0;
    let (look_token, at) = r.u64(start + ROAD_LOOK_OFFSET)?;
    let (start_node_uid, at) = r.u64(at + layout.gap)?;
    let (end_node_uid, at) = r.u64(at)?;
    let (length, mut at) = r.f32(at)?;
    for record in [layout.stamp_record, layout.sphere_record].into_iter().flatten() {
        let (count, next) = r.count(at)?;
        at = r.skip_records(next, count, record)?;
    }

    let look = ctx.resolver.road_look(look_token);
    if look.is_none() {
        warn!(uid = format_args!("{:#X}", header.uid), look = %TokenDisplay(look_token), sector = ctx.sector, offset = start, "road look not found");
    }
    Ok(Item {
        header,
        valid: look.is_some(),
        hidden,
        block_size: at - start,
        kind: ItemKind::Road(RoadItem { dlc_guard, look_token, look, start_node_uid, end_node_uid, length }),
    })
}

fn decode_prefab(r: &ByteReader<'_>, start: usize, header: ItemHeader, ctx: &ItemContext<'_>) -> Result<Item, DecodeError> {
    let layout = ctx.generation.prefab();
    let (flags, _) = r.u8(start + PREFAB_FLAGS_OFFSET)?;
    let (dlc_guard, _) = r.u8(start + PREFAB_DLC_OFFSET)?;
    let hidden = r.u8(start + PREFAB_HIDDEN_OFFSET)?.0 & 0x02 != 0;
    let secret = layout.secret_flag && flags & PREFAB_SECRET_BIT != 0;
    let (token, _) = r.u64(start + PREFAB_TOKEN_OFFSET)?;

    let mut at = r.skip(start + PREFAB_TOKEN_OFFSET, layout.look_span)?;
    if layout.additional_parts {
        let (parts, next) = r.count(at)?;
        at = r.skip_records(next, parts, 8)?;
    }
    let (node_count, next) = match layout.node_count {
        CountField::Int32 => r.count(at)?,
        CountField::LowByte => (r.u8(at)?.0 as usize, r.skip(at, 4)?),
    };
    let (node_uids, next) = r.u64_array(next, node_count)?;
    let (connected, next) = r.count(next)?;
    let next = r.skip(r.skip_records(next, connected, 8)?, 8)?;
    let (origin, next) = r.u8(next)?;
    at = r.skip(next, 1)?;
    at = r.skip_records(at, node_count, layout.node_look_size)?;
    if let Some(veg) = layout.vegetation {
        let (count, next) = r.count(at)?;
        at = r.skip(r.skip_records(next, count, veg.record)?, veg.padding)?;
        let (spheres, next) = r.count(at)?;
        at = r.skip_records(next, spheres, veg.sphere_record)?;
    }
    at = r.skip_records(at, node_count, layout.node_trailer)?;
    at = r.skip(at, layout.tail_padding)?;

    let definition = ctx.resolver.prefab(token);
    let valid = match &definition {
        None => {
            warn!(uid = format_args!("{:#X}", header.uid), prefab = %TokenDisplay(token), sector = ctx.sector, offset = start, "prefab not found");
            false
        }
        Some(def) if node_uids.is_empty() || origin as usize >= def.nodes.len() => {
            warn!(uid = format_args!("{:#X}", header.uid), prefab = %TokenDisplay(token), origin, nodes = node_uids.len(), "prefab placement does not fit its definition");
            false
        }
        Some(_) => true,
    };
    Ok(Item {
        header,
        valid,
        hidden,
        block_size: at - start,
        kind: ItemKind::Prefab(PrefabItem { dlc_guard, secret, token, definition, node_uids, origin }),
    })
}

fn decode_city(r: &ByteReader<'_>, start: usize, header: ItemHeader, ctx: &ItemContext<'_>) -> Result<Item, DecodeError> {
    r.skip(start, CITY_BLOCK_SIZE)?;
    let hidden = r.u8(start + 0x34)?.0 & 0x01 != 0;
    let (token, at) = r.u64(start + SHARED_TOKEN_OFFSET)?;
    let (width, at) = r.f32(at)?;
    let (height, at) = r.f32(at)?;
    let (node_uid, _) = r.u64(at)?;
    let city = ctx.resolver.city(token);
    if city.is_none() {
        warn!(uid = format_args!("{:#X}", header.uid), city = %TokenDisplay(token), sector = ctx.sector, "city not found");
    }
    Ok(Item {
        header,
        valid: city.is_some(),
        hidden,
        block_size: CITY_BLOCK_SIZE,
        kind: ItemKind::City(CityItem { token, city, width, height, node_uid }),
    })
}

fn decode_ferry(r: &ByteReader<'_>, start: usize, header: ItemHeader) -> Result<Item, DecodeError> {
    r.skip(start, FERRY_BLOCK_SIZE)?;
    let (port_token, at) = r.u64(start + SHARED_TOKEN_OFFSET)?;
    let (prefab_uid, at) = r.u64(at)?;
    let (node_uid, at) = r.u64(at)?;
    let unload_offset = [r.f32(at)?.0, r.f32(at + 4)?.0, r.f32(at + 8)?.0];
    Ok(Item {
        header,
        valid: true,
        hidden: false,
        block_size: FERRY_BLOCK_SIZE,
        kind: ItemKind::Ferry(FerryItem { port_token, prefab_uid, node_uid, unload_offset }),
    })
}

fn decode_map_area(r: &ByteReader<'_>, start: usize, header: ItemHeader, ctx: &ItemContext<'_>) -> Result<Item, DecodeError> {
    let draw_over = r.u8(start + 0x34)?.0 & 0x01 != 0;
    let (count, at) = r.count(start + SHARED_TOKEN_OFFSET)?;
    let (node_uids, mut at) = r.u64_array(at, count)?;
    let mut colour = None;
    if ctx.version >= MAP_AREA_COLOUR_SINCE {
        let (c, next) = r.u32(at)?;
        colour = Some(c);
        at = next;
    }
    Ok(Item {
        header,
        valid: true,
        hidden: false,
        block_size: at - start,
        kind: ItemKind::MapArea(MapAreaItem { draw_over, node_uids, colour }),
    })
}
