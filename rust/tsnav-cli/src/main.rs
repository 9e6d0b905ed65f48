use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use tsnav_core::{
    Definitions, DirectorySource, LoadReport, MapBounds, OverlaySource, PlanError, Planner, PlannerOptions, PrefabLane, RoadNetwork, Route,
};

mod config;

#[derive(Parser, Debug)]
#[command(name = "tsnav", version, about = "Plan a route between two points of a decoded truck simulator map")]
struct Args {
    /// Base game directory holding `map/` and `prefab/` trees
    #[arg(long = "game", value_name = "DIR")]
    game_dir: PathBuf,

    /// Mod directories layered over the game, later ones win
    #[arg(long = "overlay", value_name = "DIR")]
    overlays: Vec<PathBuf>,

    /// Definitions bundle (prefab descriptors, road looks, cities, ferries)
    #[arg(long = "defs", value_name = "PATH")]
    defs: PathBuf,

    /// Optional planner options JSON
    #[arg(long = "options", value_name = "PATH")]
    options: Option<PathBuf>,

    /// Logical directory containing the sector files
    #[arg(long = "map-dir", value_name = "DIR", default_value = "map/europe")]
    map_dir: String,

    #[arg(long = "from", value_names = ["X", "Z"], num_args = 2, allow_negative_numbers = true, required = true)]
    from: Vec<f32>,

    #[arg(long = "to", value_names = ["X", "Z"], num_args = 2, allow_negative_numbers = true, required = true)]
    to: Vec<f32>,

    /// Box half-size used to find the prefab at each endpoint
    #[arg(long = "tolerance", default_value_t = 25.0)]
    tolerance: f32,

    /// Also report the lanes used inside each crossed prefab
    #[arg(long = "lanes")]
    lanes: bool,
}

#[derive(Serialize)]
struct LoadSummary {
    sectors: usize,
    failed_sectors: usize,
    items: usize,
    nodes: usize,
    invalid_items: usize,
    bounds: Option<MapBounds>,
}

#[derive(Serialize)]
struct Output {
    load: LoadSummary,
    route: Option<Route>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lanes: Option<Vec<PrefabLane>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn init_logging(cfg: &config::Config) {
    let filter = EnvFilter::try_new(&cfg.log_filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cfg.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn summarize(report: &LoadReport, net: &RoadNetwork) -> LoadSummary {
    LoadSummary {
        sectors: report.sectors.len(),
        failed_sectors: report.failed_sectors(),
        items: report.items,
        nodes: report.nodes,
        invalid_items: report.invalid_items,
        bounds: net.bounds(),
    }
}

fn main() -> Result<()> {
    let cfg = config::Config::from_env();
    init_logging(&cfg);

    let args = Args::parse();
    info!(?args, "starting tsnav");

    let defs = Definitions::from_path(&args.defs).with_context(|| format!("failed to load definitions {:?}", args.defs))?;
    let options = match &args.options {
        Some(path) => PlannerOptions::from_json_file(path).with_context(|| format!("failed to load options {path:?}"))?,
        None => PlannerOptions::default(),
    };

    let mut source = OverlaySource::new().with(DirectorySource::new(&args.game_dir));
    for dir in &args.overlays {
        if !dir.is_dir() {
            warn!(overlay = %dir.display(), "overlay is not a directory, skipped");
            continue;
        }
        source.push(Box::new(DirectorySource::new(dir)));
    }

    let (mut network, report) = RoadNetwork::load(&source, defs, &args.map_dir);
    if report.sectors.is_empty() {
        anyhow::bail!("no sector files found under {:?} in {:?}", args.map_dir, args.game_dir);
    }
    network.load_navigation();
    let load = summarize(&report, &network);

    let start = network
        .find_prefab_near(args.from[0], args.from[1], args.tolerance)
        .map(|i| i.uid())
        .with_context(|| format!("no prefab within {} of {:?}", args.tolerance, args.from))?;
    let end = network
        .find_prefab_near(args.to[0], args.to[1], args.tolerance)
        .map(|i| i.uid())
        .with_context(|| format!("no prefab within {} of {:?}", args.tolerance, args.to))?;

    let graph = network.navigation().context("navigation graph missing after build")?;
    let planner = Planner::new(&network, graph, options);
    let output = match planner.calculate_path(start, end) {
        Ok(route) => {
            let lanes = args.lanes.then(|| planner.calculate_prefabs_path(&route));
            Output { load, route: Some(route), lanes, error: None }
        }
        Err(e @ PlanError::NoPathFound { .. }) => {
            warn!(start = format_args!("{start:#X}"), end = format_args!("{end:#X}"), "no route");
            Output { load, route: None, lanes: None, error: Some(e.to_string()) }
        }
        Err(e) => return Err(e).context("route planning failed"),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
