//! Scenario setup: turn a graph, a fleet, a request book and a traffic timeline into a
//! ready-to-run world.

mod build;
mod params;

pub use build::{build_from_files, build_simulation};
pub use params::{ScenarioFiles, SimulationEndTimeMs};
