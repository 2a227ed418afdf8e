//! Test helpers for common test setup and utilities.
//!
//! This module provides shared test utilities to reduce duplication across test files.

use bevy_ecs::prelude::{IntoSystemConfigs, Mut, Schedule, World};

use crate::clock::{CurrentEvent, Event, EventKind, EventSubject, SimulationClock};
use crate::config::SimulationConfig;
use crate::cost::{emissions_kg, CostFunction};
use crate::fleet::{Fleet, Propulsion, Vehicle, VehicleId};
use crate::graph::{CityGraph, EdgeSpec, NodeKind, NodeSpec, Route};
use crate::lifecycle::TripManager;
use crate::metrics::{FleetMetrics, TripRecord};
use crate::requests::{Request, RequestBook, RequestId};
use crate::routing::RouterKind;
use crate::scenario::build_simulation;
use crate::systems::traffic::TrafficTimeline;
use crate::trip::{TripId, TripPurpose};

/// `A - B - C - D` with 1 km edges at 1 km/h (one hour per edge), plus an isolated
/// node `Island`. `A` is the only attractive node and `D` is a fuel station.
pub fn chain_graph() -> CityGraph {
    let mut graph = CityGraph::new(false);
    let nodes = [
        NodeSpec::new("A").at(0.0, 0.0).with_attractiveness(5.0),
        NodeSpec::new("B").at(1.0, 0.0),
        NodeSpec::new("C").at(2.0, 0.0),
        NodeSpec::new("D").at(3.0, 0.0).with_kind(NodeKind::FuelStation),
        NodeSpec::new("Island"),
    ];
    for spec in nodes {
        graph.add_node(spec).expect("unique node");
    }
    for (from, to) in [("A", "B"), ("B", "C"), ("C", "D")] {
        graph
            .add_edge(from, to, EdgeSpec::new(format!("{from}{to}"), 1.0, 1.0))
            .expect("known nodes");
    }
    graph
}

/// A world built on [chain_graph] with two combustion vehicles of 100 km autonomy and
/// four seats: `V0` at `B` (0.5 per km) and `V1` at `C` (0.1 per km). Routing is
/// uncached uniform-cost search on distance.
pub fn chain_world() -> World {
    let mut fleet = Fleet::default();
    fleet.push(Vehicle::new(VehicleId(0), "V0", Propulsion::Combustion, 100.0, 4, 0.5, "B"));
    fleet.push(Vehicle::new(VehicleId(1), "V1", Propulsion::Combustion, 100.0, 4, 0.1, "C"));

    let config = SimulationConfig::default()
        .with_router(RouterKind::UniformCost)
        .with_cost(CostFunction::Distance)
        .with_route_cache_capacity(0);

    let mut world = World::new();
    build_simulation(
        &mut world,
        config,
        chain_graph(),
        fleet,
        RequestBook::default(),
        TrafficTimeline::default(),
    );
    world
}

/// Runs `systems` once as if an event of `kind` fired at `at`.
pub fn run_event_at<M>(
    world: &mut World,
    systems: impl IntoSystemConfigs<M>,
    at: u64,
    kind: EventKind,
    subject: Option<EventSubject>,
) {
    world.resource_mut::<SimulationClock>().set_now(at);
    world.insert_resource(CurrentEvent(Event {
        timestamp: at,
        kind,
        priority: 0,
        seq: 0,
        subject,
    }));
    let mut schedule = Schedule::default();
    schedule.add_systems(systems);
    schedule.run(world);
}

/// Places `vehicle` at the start of `route` and starts a one-passenger trip for a new
/// request picked up at `route[pickup_index]`, recording it as accepted.
///
/// # Panics
///
/// Panics if the vehicle is unknown or the trip cannot start.
pub fn start_passenger_trip(
    world: &mut World,
    vehicle: VehicleId,
    request: RequestId,
    route: &[&str],
    pickup_index: usize,
) -> TripId {
    let route: Route = route.iter().map(|node| node.to_string()).collect();
    let now = world.resource::<SimulationClock>().now();
    let origin = route[pickup_index].clone();
    let destination = route.last().cloned().expect("non-empty route");
    {
        let mut book = world.resource_mut::<RequestBook>();
        book.insert(Request::new(request.0, origin, destination, 1).at(now));
        if let Some(entry) = book.get_mut(request) {
            entry.assign(vehicle);
        }
    }

    let graph = world.resource::<CityGraph>().clone();
    let (trip, cost_per_km, propulsion) =
        world.resource_scope(|world, mut trips: Mut<TripManager>| {
            let mut fleet = world.resource_mut::<Fleet>();
            let v = fleet.get_mut(vehicle).expect("vehicle");
            v.location = route[0].clone();
            let purpose = TripPurpose::Passenger {
                request,
                passengers: 1,
            };
            let trip = trips
                .start(&graph, v, purpose, route.clone(), pickup_index, now)
                .expect("trip starts");
            (trip, v.cost_per_km, v.propulsion.clone())
        });

    let distance_km = graph.route_distance(&route[pickup_index..]);
    world.resource_mut::<FleetMetrics>().record_accepted(TripRecord {
        request,
        vehicle,
        accepted_at: now,
        response_minutes: graph.route_time(&route[..=pickup_index]) * 60.0,
        distance_km,
        cost: distance_km * cost_per_km,
        emissions_kg: emissions_kg(&propulsion, distance_km),
        shared: false,
        picked_up_at: None,
        completed_at: None,
    });
    trip
}
