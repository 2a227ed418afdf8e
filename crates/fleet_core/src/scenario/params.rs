use std::path::PathBuf;

use bevy_ecs::prelude::Resource;
use chrono::NaiveDateTime;

/// Simulation end time in milliseconds. When set, the runner stops processing events
/// once the next event would be at or after this timestamp.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimulationEndTimeMs(pub u64);

/// Locations of the JSON documents a scenario is read from.
#[derive(Debug, Clone, Default)]
pub struct ScenarioFiles {
    pub graph: PathBuf,
    pub fleet: PathBuf,
    pub requests: PathBuf,
    /// Traffic events are optional; a run without them keeps the imported levels.
    pub traffic: Option<PathBuf>,
    /// Instant mapped to simulation time zero. Defaults to the earliest request.
    pub start: Option<NaiveDateTime>,
}

impl ScenarioFiles {
    pub fn new(
        graph: impl Into<PathBuf>,
        fleet: impl Into<PathBuf>,
        requests: impl Into<PathBuf>,
    ) -> Self {
        Self {
            graph: graph.into(),
            fleet: fleet.into(),
            requests: requests.into(),
            traffic: None,
            start: None,
        }
    }

    pub fn with_traffic(mut self, traffic: impl Into<PathBuf>) -> Self {
        self.traffic = Some(traffic.into());
        self
    }

    pub fn starting_at(mut self, start: NaiveDateTime) -> Self {
        self.start = Some(start);
        self
    }
}
