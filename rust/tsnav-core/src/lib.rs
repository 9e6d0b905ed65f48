pub mod decode;
pub mod defs;
pub mod models;
pub mod navigation;
pub mod network;
pub mod options;
pub mod planner;
pub mod prefab;
pub mod source;
pub mod token;

pub use defs::{Definitions, DefsError, FerryConnection, RoadLook};
pub use models::{Item, ItemKind, ItemType, Node};
pub use navigation::{EdgePath, NavEdge, NavigationGraph};
pub use network::{LoadReport, MapBounds, RoadNetwork};
pub use options::{BridgeStrategy, PlannerOptions};
pub use planner::{Bridge, CancelToken, FerryCrossing, PlanError, Planner, PrefabLane, Route};
pub use source::{DirectorySource, FileSource, MemorySource, OverlaySource, SourceError};
pub use token::{to_token, token_name, TokenDisplay};
