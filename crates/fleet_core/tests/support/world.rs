#![allow(dead_code)]

use bevy_ecs::prelude::World;
use fleet_core::config::SimulationConfig;
use fleet_core::fleet::{Fleet, Vehicle};
use fleet_core::graph::CityGraph;
use fleet_core::requests::{Request, RequestBook};
use fleet_core::scenario::build_simulation;
use fleet_core::systems::traffic::{TrafficChange, TrafficTimeline};

use super::graph::town;

/// Builder for worlds used by integration tests. Defaults to the [town] graph, no
/// vehicles, no requests and an uncached router.
pub struct TestWorldBuilder {
    graph: CityGraph,
    vehicles: Vec<Vehicle>,
    requests: Vec<Request>,
    traffic: Vec<TrafficChange>,
    config: SimulationConfig,
}

impl Default for TestWorldBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorldBuilder {
    pub fn new() -> Self {
        Self {
            graph: town(),
            vehicles: Vec::new(),
            requests: Vec::new(),
            traffic: Vec::new(),
            config: SimulationConfig::default().with_route_cache_capacity(0),
        }
    }

    pub fn with_graph(mut self, graph: CityGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_vehicle(mut self, vehicle: Vehicle) -> Self {
        self.vehicles.push(vehicle);
        self
    }

    pub fn with_request(mut self, request: Request) -> Self {
        self.requests.push(request);
        self
    }

    pub fn with_traffic_change(mut self, change: TrafficChange) -> Self {
        self.traffic.push(change);
        self
    }

    pub fn with_config(mut self, f: impl FnOnce(SimulationConfig) -> SimulationConfig) -> Self {
        self.config = f(self.config);
        self
    }

    pub fn build(self) -> World {
        let mut fleet = Fleet::default();
        for vehicle in self.vehicles {
            fleet.push(vehicle);
        }
        let mut book = RequestBook::default();
        for request in self.requests {
            assert!(book.insert(request), "duplicate request id in fixture");
        }
        let traffic: TrafficTimeline = self.traffic.into_iter().collect();

        let mut world = World::new();
        build_simulation(&mut world, self.config, self.graph, fleet, book, traffic);
        world
    }
}
