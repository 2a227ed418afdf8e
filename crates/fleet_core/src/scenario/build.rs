use bevy_ecs::prelude::World;

use crate::allocation::{build_allocator, AllocatorResource};
use crate::clock::SimulationClock;
use crate::config::SimulationConfig;
use crate::error::LoadError;
use crate::fleet::Fleet;
use crate::graph::CityGraph;
use crate::import::{load_fleet, load_graph, load_requests, load_traffic_events};
use crate::lifecycle::TripManager;
use crate::metrics::FleetMetrics;
use crate::requests::RequestBook;
use crate::routing::{build_router, Router};
use crate::scenario::params::{ScenarioFiles, SimulationEndTimeMs};
use crate::systems::dynamics::DynamicsState;
use crate::systems::repositioning::RepositioningState;
use crate::systems::traffic::TrafficTimeline;
use crate::telemetry::{SimSnapshotConfig, SimSnapshots};

/// Inserts every resource the simulation schedule reads.
///
/// Strategies and policies are built once from `config`; the config itself stays in the
/// world for the penalty, tick interval and dynamic conditions.
pub fn build_simulation(
    world: &mut World,
    config: SimulationConfig,
    graph: CityGraph,
    fleet: Fleet,
    requests: RequestBook,
    traffic: TrafficTimeline,
) {
    let router = build_router(
        config.router,
        config.cost,
        config.heuristic,
        config.route_cache_capacity,
    );
    log::info!(
        "building simulation: {} nodes, {} edges, {} vehicles, {} requests, router {}",
        graph.node_count(),
        graph.edge_count(),
        fleet.len(),
        requests.len(),
        router.name()
    );

    world.insert_resource(SimulationClock::default());
    world.insert_resource(SimulationEndTimeMs(config.end_time_ms()));
    world.insert_resource(Router::new(router));
    world.insert_resource(AllocatorResource::new(build_allocator(config.allocator)));
    world.insert_resource(config.recharge);
    world.insert_resource(config.ridesharing);
    world.insert_resource(config.repositioning);
    world.insert_resource(RepositioningState::default());
    world.insert_resource(DynamicsState::new(&config.dynamics));
    world.insert_resource(SimSnapshotConfig {
        interval_ms: config.snapshot_interval_ms,
        max_snapshots: config.max_snapshots,
    });
    world.insert_resource(SimSnapshots::default());
    world.insert_resource(graph);
    world.insert_resource(fleet);
    world.insert_resource(requests);
    world.insert_resource(traffic);
    world.insert_resource(TripManager::default());
    world.insert_resource(FleetMetrics::default());
    world.insert_resource(config);
}

/// Loads the scenario documents and builds the world from them.
pub fn build_from_files(
    world: &mut World,
    config: SimulationConfig,
    files: &ScenarioFiles,
) -> Result<(), LoadError> {
    let graph = load_graph(&files.graph)?;
    let fleet = load_fleet(&files.fleet, &graph)?;
    let requests = load_requests(&files.requests, &graph, files.start)?;
    let traffic = match &files.traffic {
        Some(path) => load_traffic_events(path)?,
        None => TrafficTimeline::default(),
    };
    build_simulation(world, config, graph, fleet, requests, traffic);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{Propulsion, Vehicle, VehicleId};
    use crate::graph::NodeSpec;
    use crate::policies::RechargePolicy;

    #[test]
    fn inserts_policies_and_end_time_from_config() {
        let mut graph = CityGraph::new(false);
        graph.add_node(NodeSpec::new("A")).unwrap();
        let mut fleet = Fleet::default();
        fleet.push(Vehicle::new(VehicleId(0), "V", Propulsion::Combustion, 50.0, 4, 0.2, "A"));

        let config = SimulationConfig::default()
            .with_duration_hours(2.0)
            .with_recharge(RechargePolicy::Disabled);
        let mut world = World::new();
        build_simulation(
            &mut world,
            config,
            graph,
            fleet,
            RequestBook::default(),
            TrafficTimeline::default(),
        );

        assert_eq!(world.resource::<SimulationEndTimeMs>().0, 2 * crate::clock::ONE_HOUR_MS);
        assert_eq!(*world.resource::<RechargePolicy>(), RechargePolicy::Disabled);
        assert_eq!(world.resource::<Fleet>().len(), 1);
        assert!(world.resource::<SimulationClock>().is_empty());
    }
}
