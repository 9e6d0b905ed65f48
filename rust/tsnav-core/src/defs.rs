//! Token-keyed definition registries.
//!
//! Text definition files are parsed elsewhere; this crate consumes them as one
//! JSON bundle. Tokens in the bundle may be written as names (`"hu_gas"`) or as
//! raw numbers.

use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::prefab::PrefabDescriptor;
use crate::token::{to_token, TokenDisplay, TokenError};

/// Width contributed by each lane, in metres.
pub const LANE_WIDTH: f32 = 4.5;
/// Ferry waypoint coordinates are stored scaled like node positions.
pub const FERRY_POSITION_DIVISOR: f32 = 256.0;

const LOCAL_LANES: &[&str] = &["traffic_lane.road.local", "traffic_lane.road.local.tram", "traffic_lane.road.local.no_overtake"];
const EXPRESS_LANES: &[&str] = &["traffic_lane.road.expressway", "traffic_lane.road.divided"];
const HIGHWAY_LANES: &[&str] = &[
    "traffic_lane.road.motorway",
    "traffic_lane.road.motorway.low_density",
    "traffic_lane.road.freeway",
    "traffic_lane.road.freeway.low_density",
    "traffic_lane.road.divided",
];
const NO_VEHICLE_LANES: &[&str] = &["traffic_lane.no_vehicles"];

#[derive(Debug, thiserror::Error)]
pub enum DefsError {
    #[error("failed to read definitions from {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("malformed definitions bundle: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadLook {
    pub token: u64,
    pub lanes_left: Vec<String>,
    pub lanes_right: Vec<String>,
    pub offset: f32,
    pub is_local: bool,
    pub is_express: bool,
    pub is_highway: bool,
    pub is_no_vehicles: bool,
}

impl RoadLook {
    pub fn new(token: u64, lanes_left: Vec<String>, lanes_right: Vec<String>, offset: f32) -> Self {
        let any = |set: &[&str]| lanes_left.iter().chain(lanes_right.iter()).any(|l| set.contains(&l.as_str()));
        let (is_local, is_express, is_highway, is_no_vehicles) =
            (any(LOCAL_LANES), any(EXPRESS_LANES), any(HIGHWAY_LANES), any(NO_VEHICLE_LANES));
        Self { token, lanes_left, lanes_right, offset, is_local, is_express, is_highway, is_no_vehicles }
    }

    pub fn width(&self) -> f32 {
        self.offset + LANE_WIDTH * (self.lanes_left.len() + self.lanes_right.len()) as f32
    }

    pub fn is_bidirectional(&self) -> bool {
        !self.lanes_left.is_empty() && !self.lanes_right.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct City {
    pub token: u64,
    pub name: String,
    pub country: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Country {
    pub token: u64,
    pub name: String,
    pub id: i32,
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FerryPoint {
    pub x: f32,
    pub z: f32,
    pub heading: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FerryConnection {
    pub start_port: u64,
    pub end_port: u64,
    pub start_location: Option<(f32, f32)>,
    pub end_location: Option<(f32, f32)>,
    pub waypoints: Vec<FerryPoint>,
    pub price: i32,
    pub time: i32,
    pub distance: i32,
}

impl FerryConnection {
    pub fn new(start_port: u64, end_port: u64, distance: i32) -> Self {
        Self { start_port, end_port, start_location: None, end_location: None, waypoints: Vec::new(), price: 0, time: 0, distance }
    }

    fn links(&self, a: u64, b: u64) -> bool {
        (self.start_port == a && self.end_port == b) || (self.start_port == b && self.end_port == a)
    }

    pub fn set_port_location(&mut self, port: u64, x: f32, z: f32) {
        if port == self.start_port {
            self.start_location = Some((x, z));
        } else if port == self.end_port {
            self.end_location = Some((x, z));
        }
    }

    pub fn located(&self) -> bool { self.start_location.is_some() && self.end_location.is_some() }
}

/// One record per unordered port pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FerryRegistry {
    connections: Vec<FerryConnection>,
}

impl FerryRegistry {
    /// Returns false when the pair is already registered in either direction.
    pub fn insert(&mut self, conn: FerryConnection) -> bool {
        if self.connections.iter().any(|c| c.links(conn.start_port, conn.end_port)) {
            return false;
        }
        self.connections.push(conn);
        true
    }

    pub fn set_port_location(&mut self, port: u64, x: f32, z: f32) {
        for conn in self.connections.iter_mut().filter(|c| c.start_port == port || c.end_port == port) {
            conn.set_port_location(port, x, z);
        }
    }

    /// Drops connections whose ports were never placed on the map.
    pub fn prune_unlocated(&mut self) -> usize {
        let before = self.connections.len();
        self.connections.retain(|c| {
            if !c.located() {
                debug!(start = %TokenDisplay(c.start_port), end = %TokenDisplay(c.end_port), "dropping ferry connection without port locations");
            }
            c.located()
        });
        before - self.connections.len()
    }

    /// Connections departing from `port`.
    pub fn lookup(&self, port: u64) -> Vec<&FerryConnection> {
        self.connections.iter().filter(|c| c.start_port == port).collect()
    }

    pub fn len(&self) -> usize { self.connections.len() }
    pub fn is_empty(&self) -> bool { self.connections.is_empty() }
    pub fn iter(&self) -> impl Iterator<Item = &FerryConnection> { self.connections.iter() }
}

/// Token written either as a resource name or as the packed number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenRef {
    Raw(u64),
    Name(String),
}

impl TokenRef {
    pub fn resolve(&self) -> Result<u64, TokenError> {
        match self {
            TokenRef::Raw(v) => Ok(*v),
            TokenRef::Name(n) => to_token(n),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionsBundle {
    pub prefabs: Vec<PrefabEntry>,
    pub road_looks: Vec<RoadLookEntry>,
    pub cities: Vec<CityEntry>,
    pub countries: Vec<CountryEntry>,
    pub ferry_connections: Vec<FerryEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefabEntry {
    pub token: TokenRef,
    pub path: String,
    #[serde(default)]
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadLookEntry {
    pub token: TokenRef,
    #[serde(default)]
    pub lanes_left: Vec<String>,
    #[serde(default)]
    pub lanes_right: Vec<String>,
    #[serde(default)]
    pub offset: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityEntry {
    pub token: TokenRef,
    pub name: String,
    pub country: TokenRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryEntry {
    pub token: TokenRef,
    pub name: String,
    #[serde(default)]
    pub id: i32,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FerryEntry {
    pub start_port: TokenRef,
    pub end_port: TokenRef,
    #[serde(default)]
    pub price: i32,
    #[serde(default)]
    pub time: i32,
    #[serde(default)]
    pub distance: i32,
    /// Raw (x, y, z) vectors, scaled by 256.
    #[serde(default)]
    pub positions: Vec<[f32; 3]>,
    #[serde(default)]
    pub directions: Vec<[f32; 3]>,
}

/// Resolved registries handed to the network loader.
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub prefabs: FxHashMap<u64, PrefabDescriptor>,
    pub road_looks: FxHashMap<u64, Arc<RoadLook>>,
    pub cities: FxHashMap<u64, Arc<City>>,
    pub countries: FxHashMap<u64, Arc<Country>>,
    pub ferries: FerryRegistry,
}

impl Definitions {
    pub fn from_json_str(text: &str) -> Result<Self, DefsError> {
        let bundle: DefinitionsBundle = serde_json::from_str(text)?;
        Self::from_bundle(bundle)
    }

    pub fn from_path(path: &Path) -> Result<Self, DefsError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| DefsError::Io { path: path.display().to_string(), source })?;
        Self::from_json_str(&text)
    }

    /// First entry wins for duplicate tokens.
    pub fn from_bundle(bundle: DefinitionsBundle) -> Result<Self, DefsError> {
        let mut defs = Definitions::default();
        for p in bundle.prefabs {
            let token = p.token.resolve()?;
            defs.prefabs.entry(token).or_insert(PrefabDescriptor { token, path: p.path, category: p.category });
        }
        for r in bundle.road_looks {
            let token = r.token.resolve()?;
            defs.road_looks.entry(token).or_insert_with(|| Arc::new(RoadLook::new(token, r.lanes_left, r.lanes_right, r.offset)));
        }
        for c in bundle.countries {
            let token = c.token.resolve()?;
            defs.countries.entry(token).or_insert_with(|| Arc::new(Country { token, name: c.name, id: c.id, code: c.code }));
        }
        for c in bundle.cities {
            let token = c.token.resolve()?;
            let country = c.country.resolve()?;
            defs.cities.entry(token).or_insert_with(|| Arc::new(City { token, name: c.name, country }));
        }
        for f in bundle.ferry_connections {
            let mut conn = FerryConnection::new(f.start_port.resolve()?, f.end_port.resolve()?, f.distance);
            conn.price = f.price;
            conn.time = f.time;
            conn.waypoints = f
                .positions
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let heading = f.directions.get(i).map(|d| d[2].atan2(d[0])).unwrap_or(0.0);
                    FerryPoint { x: p[0] / FERRY_POSITION_DIVISOR, z: p[2] / FERRY_POSITION_DIVISOR, heading }
                })
                .collect();
            defs.ferries.insert(conn);
        }
        debug!(
            prefabs = defs.prefabs.len(),
            road_looks = defs.road_looks.len(),
            cities = defs.cities.len(),
            countries = defs.countries.len(),
            ferries = defs.ferries.len(),
            "definitions loaded"
        );
        Ok(defs)
    }

    pub fn add_prefab(&mut self, token: u64, path: impl Into<String>) {
        self.prefabs.insert(token, PrefabDescriptor { token, path: path.into(), category: String::new() });
    }

    pub fn add_road_look(&mut self, look: RoadLook) {
        self.road_looks.insert(look.token, Arc::new(look));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn road_look_width_and_direction() {
        let look = RoadLook::new(1, vec!["traffic_lane.road.local".into()], vec!["traffic_lane.road.local".into()], 1.0);
        assert_eq!(look.width(), 10.0);
        assert!(look.is_bidirectional());
        assert!(look.is_local && !look.is_highway);

        let one_way = RoadLook::new(2, vec![], vec!["traffic_lane.road.motorway".into(), "traffic_lane.road.motorway".into()], 0.0);
        assert_eq!(one_way.width(), 9.0);
        assert!(!one_way.is_bidirectional());
        assert!(one_way.is_highway);
    }

    #[test]
    fn ferry_pairs_are_deduplicated() {
        let mut reg = FerryRegistry::default();
        assert!(reg.insert(FerryConnection::new(1, 2, 500)));
        assert!(!reg.insert(FerryConnection::new(2, 1, 700)));
        assert!(reg.insert(FerryConnection::new(1, 3, 100)));
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.lookup(1).len(), 2);
        assert!(reg.lookup(2).is_empty());
    }

    #[test]
    fn unlocated_connections_are_pruned() {
        let mut reg = FerryRegistry::default();
        reg.insert(FerryConnection::new(1, 2, 500));
        reg.insert(FerryConnection::new(3, 4, 10));
        reg.set_port_location(1, 0.0, 0.0);
        reg.set_port_location(2, 500.0, 0.0);
        reg.set_port_location(3, 9.0, 9.0);
        assert_eq!(reg.prune_unlocated(), 1);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.lookup(1)[0].end_location, Some((500.0, 0.0)));
    }

    #[test]
    fn bundle_accepts_names_and_numbers() {
        let text = r#"{
            "prefabs": [{ "token": "cross", "path": "prefab/cross.ppd" }, { "token": 99, "path": "prefab/other.ppd", "category": "dlc" }],
            "road_looks": [{ "token": "look1", "lanes_left": ["a"], "lanes_right": ["b"], "offset": 2.0 }],
            "countries": [{ "token": "germany", "name": "Germany", "id": 7, "code": "DE" }],
            "cities": [{ "token": "berlin", "name": "Berlin", "country": "germany" }],
            "ferry_connections": [
                { "start_port": 1, "end_port": 2, "distance": 500, "positions": [[2560.0, 0.0, 512.0]], "directions": [[0.0, 0.0, 1.0]] },
                { "start_port": 2, "end_port": 1, "distance": 500 }
            ]
        }"#;
        let defs = Definitions::from_json_str(text).unwrap();
        assert_eq!(defs.prefabs[&to_token("cross").unwrap()].path, "prefab/cross.ppd");
        assert_eq!(defs.prefabs[&99].category, "dlc");
        assert_eq!(defs.road_looks[&to_token("look1").unwrap()].width(), 11.0);
        let berlin = &defs.cities[&to_token("berlin").unwrap()];
        assert_eq!(berlin.country, to_token("germany").unwrap());
        assert_eq!(defs.ferries.len(), 1);
        let conn = defs.ferries.lookup(1)[0];
        assert_eq!(conn.waypoints.len(), 1);
        assert_eq!(conn.waypoints[0].x, 10.0);
        assert_eq!(conn.waypoints[0].z, 2.0);
        assert!((conn.waypoints[0].heading - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn bad_token_names_are_errors() {
        let text = r#"{ "road_looks": [{ "token": "not-a-token" }] }"#;
        assert!(matches!(Definitions::from_json_str(text), Err(DefsError::Token(_))));
    }
}
