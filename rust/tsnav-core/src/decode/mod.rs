//! Sector and item record decoding.

mod items;
mod layout;
mod reader;
mod sector;

pub use items::{decode_header, decode_item, DefinitionResolver, ItemContext};
pub use layout::{CountField, LayoutGeneration, PrefabLayout, RoadLayout, VegetationLayout, MAX_SECTOR_VERSION, MIN_SECTOR_VERSION};
pub use reader::{ByteReader, DecodeError, FIXED_POINT_DIVISOR};
pub use sector::{decode_node, decode_sector, DecodedSector, SectorError, NODE_RECORD_SIZE, SECTOR_ITEMS_OFFSET};
