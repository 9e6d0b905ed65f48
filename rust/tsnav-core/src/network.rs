//! The decoded road network: nodes and items from every sector, cross-linked.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::decode::{decode_sector, DecodedSector, DefinitionResolver};
use crate::defs::{City, Country, Definitions, FerryConnection, FerryRegistry, RoadLook};
use crate::models::{Item, ItemKind, Node};
use crate::navigation::NavigationGraph;
use crate::prefab::{PrefabDefinition, PrefabRegistry};
use crate::source::FileSource;

pub const SECTOR_EXTENSION: &str = ".base";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectorReport {
    pub path: String,
    pub items: usize,
    pub nodes: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub sectors: Vec<SectorReport>,
    pub items: usize,
    pub nodes: usize,
    pub invalid_items: usize,
    pub duplicate_uids: usize,
    pub unresolved_links: usize,
    pub pruned_ferries: usize,
}

impl LoadReport {
    pub fn failed_sectors(&self) -> usize { self.sectors.iter().filter(|s| s.error.is_some()).count() }
}

struct LoadResolver<'a> {
    defs: &'a Definitions,
    prefabs: &'a PrefabRegistry,
    source: &'a dyn FileSource,
}

impl DefinitionResolver for LoadResolver<'_> {
    fn prefab(&self, token: u64) -> Option<Arc<PrefabDefinition>> { self.prefabs.lookup(token, self.source) }
    fn road_look(&self, token: u64) -> Option<Arc<RoadLook>> { self.defs.road_looks.get(&token).cloned() }
    fn city(&self, token: u64) -> Option<Arc<City>> { self.defs.cities.get(&token).cloned() }
}

pub struct RoadNetwork {
    nodes: IndexMap<u64, Node>,
    items: IndexMap<u64, Item>,
    /// First ferry terminal item placed for each port token.
    ferry_ports: IndexMap<u64, u64>,
    defs: Definitions,
    prefabs: PrefabRegistry,
    bounds: Option<MapBounds>,
    navigation: Option<NavigationGraph>,
}

impl RoadNetwork {
    /// Decodes every sector under `map_dir` and links the result.
    ///
    /// A sector that fails to decode is reported and skipped; the rest still load.
    pub fn load(source: &dyn FileSource, mut definitions: Definitions, map_dir: &str) -> (Self, LoadReport) {
        let prefabs = PrefabRegistry::new(std::mem::take(&mut definitions.prefabs));
        let mut report = LoadReport::default();
        let mut decoded = Vec::new();
        {
            let resolver = LoadResolver { defs: &definitions, prefabs: &prefabs, source };
            for path in source.list(map_dir, SECTOR_EXTENSION) {
                let result = source
                    .read_file(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| decode_sector(&path, &bytes, &resolver).map_err(|e| e.to_string()));
                match result {
                    Ok(sector) => {
                        report.sectors.push(SectorReport { path, items: sector.items.len(), nodes: sector.nodes.len(), error: None });
                        decoded.push(sector);
                    }
                    Err(error) => {
                        warn!(sector = %path, %error, "sector skipped");
                        report.sectors.push(SectorReport { path, error: Some(error), ..Default::default() });
                    }
                }
            }
        }
        let network = Self::assemble(decoded, definitions, prefabs, &mut report);
        info!(
            sectors = report.sectors.len(),
            failed = report.failed_sectors(),
            items = report.items,
            nodes = report.nodes,
            invalid = report.invalid_items,
            prefab_decodes = network.prefabs.decode_count(),
            "road network loaded"
        );
        (network, report)
    }

    /// Links already decoded sectors.
    pub fn from_sectors(sectors: Vec<DecodedSector>, definitions: Definitions) -> (Self, LoadReport) {
        let mut definitions = definitions;
        let prefabs = PrefabRegistry::new(std::mem::take(&mut definitions.prefabs));
        let mut report = LoadReport::default();
        for s in &sectors {
            report.sectors.push(SectorReport { path: s.path.clone(), items: s.items.len(), nodes: s.nodes.len(), error: None });
        }
        let network = Self::assemble(sectors, definitions, prefabs, &mut report);
        (network, report)
    }

    fn assemble(sectors: Vec<DecodedSector>, defs: Definitions, prefabs: PrefabRegistry, report: &mut LoadReport) -> Self {
        let mut network = RoadNetwork {
            nodes: IndexMap::new(),
            items: IndexMap::new(),
            ferry_ports: IndexMap::new(),
            defs,
            prefabs,
            bounds: None,
            navigation: None,
        };
        for sector in sectors {
            for item in sector.items {
                if network.items.contains_key(&item.uid()) {
                    warn!(uid = format_args!("{:#X}", item.uid()), sector = %sector.path, "duplicate item uid, keeping the first");
                    report.duplicate_uids += 1;
                    continue;
                }
                if !item.valid {
                    report.invalid_items += 1;
                }
                if let ItemKind::Prefab(p) = &item.kind {
                    if let Some(def) = &p.definition {
                        network.prefabs.seed(def.clone());
                    }
                }
                network.items.insert(item.uid(), item);
            }
            for node in sector.nodes {
                if network.nodes.contains_key(&node.uid) {
                    report.duplicate_uids += 1;
                    continue;
                }
                network.nodes.insert(node.uid, node);
            }
        }

        for item in network.items.values() {
            if let ItemKind::Ferry(f) = &item.kind {
                network.ferry_ports.entry(f.port_token).or_insert(item.uid());
                network.defs.ferries.set_port_location(f.port_token, item.x(), item.z());
            }
        }
        report.pruned_ferries = network.defs.ferries.prune_unlocated();

        report.unresolved_links = network.resolve_links();
        network.bounds = network.compute_bounds();
        report.items = network.items.len();
        report.nodes = network.nodes.len();
        network
    }

    /// Points every node at the items stored under its forward/backward uids.
    fn resolve_links(&mut self) -> usize {
        fn resolve(items: &IndexMap<u64, Item>, node_uid: u64, item_uid: u64, unresolved: &mut usize) -> Option<u64> {
            if item_uid == 0 {
                return None;
            }
            match items.get(&item_uid) {
                Some(item) if item.touches_node(node_uid) => Some(item_uid),
                _ => {
                    *unresolved += 1;
                    None
                }
            }
        }

        let mut unresolved = 0;
        for node in self.nodes.values_mut() {
            node.forward_item = resolve(&self.items, node.uid, node.forward_item_uid, &mut unresolved);
            node.backward_item = resolve(&self.items, node.uid, node.backward_item_uid, &mut unresolved);
        }
        if unresolved > 0 {
            debug!(unresolved, "node links left empty");
        }
        unresolved
    }

    fn compute_bounds(&self) -> Option<MapBounds> {
        let mut it = self.nodes.values();
        let first = it.next()?;
        let init = MapBounds { min_x: first.x, max_x: first.x, min_z: first.z, max_z: first.z };
        Some(it.fold(init, |b, n| MapBounds {
            min_x: b.min_x.min(n.x),
            max_x: b.max_x.max(n.x),
            min_z: b.min_z.min(n.z),
            max_z: b.max_z.max(n.z),
        }))
    }

    pub fn get_node_by_uid(&self, uid: u64) -> Option<&Node> { self.nodes.get(&uid) }
    pub fn item(&self, uid: u64) -> Option<&Item> { self.items.get(&uid) }
    pub fn nodes(&self) -> impl Iterator<Item = &Node> { self.nodes.values() }
    pub fn items(&self) -> impl Iterator<Item = &Item> { self.items.values() }
    pub fn prefab_items(&self) -> impl Iterator<Item = &Item> { self.items.values().filter(|i| i.is_prefab()) }
    pub fn ferry_item_for_port(&self, port: u64) -> Option<&Item> { self.ferry_ports.get(&port).and_then(|uid| self.items.get(uid)) }
    pub fn ferry_ports(&self) -> impl Iterator<Item = u64> + '_ { self.ferry_ports.keys().copied() }

    /// Decoded definition for a prefab token, if any placement referenced it.
    pub fn lookup_prefab(&self, token: u64) -> Option<Arc<PrefabDefinition>> { self.prefabs.cached(token) }
    pub fn lookup_road_look(&self, token: u64) -> Option<Arc<RoadLook>> { self.defs.road_looks.get(&token).cloned() }
    pub fn lookup_city(&self, token: u64) -> Option<Arc<City>> { self.defs.cities.get(&token).cloned() }
    pub fn lookup_country(&self, token: u64) -> Option<Arc<Country>> { self.defs.countries.get(&token).cloned() }
    pub fn lookup_ferry_connections(&self, port: u64) -> Vec<&FerryConnection> { self.defs.ferries.lookup(port) }
    pub fn ferry_connections(&self) -> &FerryRegistry { &self.defs.ferries }
    pub fn prefab_registry(&self) -> &PrefabRegistry { &self.prefabs }

    pub fn bounds(&self) -> Option<MapBounds> { self.bounds }

    /// First prefab placement whose position lies within `tolerance` of (x, z) on both axes.
    pub fn find_prefab_near(&self, x: f32, z: f32, tolerance: f32) -> Option<&Item> {
        self.prefab_items().find(|i| (i.x() - x).abs() <= tolerance && (i.z() - z).abs() <= tolerance)
    }

    /// The prefab item at a boundary node other than `except`, forward side first.
    pub fn prefabs_at_node(&self, node_uid: u64, except: u64) -> Vec<u64> {
        let Some(node) = self.nodes.get(&node_uid) else { return Vec::new() };
        [node.forward_item, node.backward_item]
            .into_iter()
            .flatten()
            .filter(|&uid| uid != except && self.items.get(&uid).map_or(false, Item::is_prefab))
            .collect()
    }

    /// Builds the navigation graph, replacing any previous one.
    pub fn load_navigation(&mut self) -> &NavigationGraph {
        let graph = NavigationGraph::build(self);
        self.navigation.insert(graph)
    }

    pub fn navigation(&self) -> Option<&NavigationGraph> { self.navigation.as_ref() }
}
