//! Load a JSON data set, run it and print the metrics report.
//!
//! Run with: cargo run -p fleet_core --example run_dataset -- [DATA_DIR] [OUT_DIR]
//!
//! DATA_DIR must hold grafo.json, veiculos.json and pedidos.json; transito.json and
//! config.json are optional. Defaults to the bundled `data/demo` set. When OUT_DIR is
//! given, trip records, rejections and snapshot counts are written there as Parquet.

use std::env;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use bevy_ecs::prelude::World;
use fleet_core::clock::SimulationClock;
use fleet_core::config::SimulationConfig;
use fleet_core::metrics::FleetMetrics;
use fleet_core::metrics_export::{
    write_rejections_parquet, write_snapshot_counts_parquet, write_trip_records_parquet,
};
use fleet_core::runner::{initialize_simulation, run_until_empty, simulation_schedule};
use fleet_core::scenario::{build_from_files, ScenarioFiles};
use fleet_core::telemetry::SimSnapshots;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let data_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/demo"));
    let out_dir = args.next().map(PathBuf::from);

    let mut files = ScenarioFiles::new(
        data_dir.join("grafo.json"),
        data_dir.join("veiculos.json"),
        data_dir.join("pedidos.json"),
    );
    let traffic = data_dir.join("transito.json");
    if traffic.exists() {
        files = files.with_traffic(traffic);
    }
    let config_path = data_dir.join("config.json");
    let config = if config_path.exists() {
        SimulationConfig::from_json_str(&fs::read_to_string(&config_path)?)?
    } else {
        SimulationConfig::default()
    };

    let mut world = World::new();
    build_from_files(&mut world, config, &files)?;
    initialize_simulation(&mut world);

    let mut schedule = simulation_schedule();
    let steps = run_until_empty(&mut world, &mut schedule, 1_000_000);
    let now = world.resource::<SimulationClock>().now();

    println!("--- Data set {} ---", data_dir.display());
    println!("Steps executed: {steps}");
    println!("Simulation time: {:.1} min", now as f64 / 60_000.0);
    let metrics = world.resource::<FleetMetrics>();
    println!("{}", metrics.report());

    if let Some(out_dir) = out_dir {
        fs::create_dir_all(&out_dir)?;
        write_trip_records_parquet(out_dir.join("trips.parquet"), metrics)?;
        write_rejections_parquet(out_dir.join("rejections.parquet"), metrics)?;
        write_snapshot_counts_parquet(
            out_dir.join("snapshots.parquet"),
            world.resource::<SimSnapshots>(),
        )?;
        println!("Parquet files written to {}", out_dir.display());
    }
    Ok(())
}
