use bevy_ecs::prelude::{Res, ResMut, Resource};

use crate::clock::{EventKind, SimulationClock, ONE_MIN_MS};
use crate::fleet::{Fleet, Vehicle, VehicleState};
use crate::graph::CityGraph;
use crate::lifecycle::TripManager;
use crate::metrics::{FleetMetrics, RepositionRecord};
use crate::policies::RepositioningPolicy;
use crate::requests::RequestBook;
use crate::routing::Router;
use crate::systems::schedule_trip_events;
use crate::trip::TripPurpose;

#[derive(Debug, Default, Resource)]
pub struct RepositioningState {
    pub last_run_at: Option<u64>,
}

/// Moves idle vehicles toward the zones the policy ranks highest, then books the next run.
#[allow(clippy::too_many_arguments)]
pub fn repositioning_system(
    mut clock: ResMut<SimulationClock>,
    graph: Res<CityGraph>,
    router: Res<Router>,
    policy: Res<RepositioningPolicy>,
    requests: Res<RequestBook>,
    mut state: ResMut<RepositioningState>,
    mut fleet: ResMut<Fleet>,
    mut trips: ResMut<TripManager>,
    mut metrics: ResMut<FleetMetrics>,
) {
    let Some(params) = policy.params() else {
        return;
    };
    let now = clock.now();
    if !policy.is_due(now, state.last_run_at) {
        return;
    }

    let moves = {
        let idle: Vec<&Vehicle> = fleet
            .iter()
            .filter(|v| {
                v.state == VehicleState::Available
                    && v.pending_plan.is_none()
                    && v.queued_request.is_none()
                    && !trips.has_active(v.id)
            })
            .collect();
        policy.decide(&idle, &graph, &requests, now, state.last_run_at)
    };
    state.last_run_at = Some(now);
    clock.schedule_in(params.interval_minutes.max(1) * ONE_MIN_MS, EventKind::RepositionRun, None);

    for next in moves {
        let Some(vehicle) = fleet.get_mut(next.vehicle) else {
            continue;
        };
        let Some(route) = router
            .route(&graph, &vehicle.location, &next.target, Some(&*vehicle))
            .filter(|route| route.len() >= 2)
        else {
            log::debug!("no route to move vehicle {} to {}", vehicle.label, next.target);
            continue;
        };
        let distance_km = graph.route_distance(&route);
        if distance_km > vehicle.autonomy_km {
            continue;
        }
        let from = vehicle.location.clone();
        match trips.start(&graph, vehicle, TripPurpose::Reposition, route, 0, now) {
            Ok(trip) => {
                if let Some(trip) = trips.get(trip) {
                    schedule_trip_events(&mut clock, trip);
                }
            }
            Err(err) => {
                log::warn!("vehicle {} could not reposition: {:?}", vehicle.label, err);
                continue;
            }
        }
        log::info!("repositioning vehicle {} from {} to {}", vehicle.label, from, next.target);
        metrics.record_reposition(RepositionRecord {
            at: now,
            vehicle: next.vehicle,
            from,
            to: next.target,
            distance_km,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::VehicleId;
    use crate::policies::RepositionParams;
    use crate::test_helpers::{chain_world, run_event_at};

    fn attractive_a(world: &mut bevy_ecs::prelude::World) {
        let params = RepositionParams {
            top_k: 1,
            vehicle_fraction: 1.0,
            max_distance: 100.0,
            interval_minutes: 15,
        };
        world.insert_resource(RepositioningPolicy::Attractiveness(params));
    }

    #[test]
    fn idle_vehicles_head_to_hot_zone() {
        let mut world = chain_world();
        attractive_a(&mut world);
        run_event_at(&mut world, repositioning_system, 0, EventKind::RepositionRun, None);

        let metrics = world.resource::<FleetMetrics>();
        assert_eq!(metrics.repositions.len(), 2);
        assert!(metrics.repositions.iter().all(|r| r.to == "A"));
        let fleet = world.resource::<Fleet>();
        assert_eq!(fleet.get(VehicleId(0)).unwrap().state, VehicleState::EnRoute);
        assert_eq!(world.resource::<RepositioningState>().last_run_at, Some(0));
    }

    #[test]
    fn runs_are_spaced_by_the_interval() {
        let mut world = chain_world();
        attractive_a(&mut world);
        world.resource_mut::<RepositioningState>().last_run_at = Some(0);

        run_event_at(
            &mut world,
            repositioning_system,
            5 * ONE_MIN_MS,
            EventKind::RepositionRun,
            None,
        );
        assert!(world.resource::<FleetMetrics>().repositions.is_empty());
        assert_eq!(world.resource::<SimulationClock>().len(), 0);

        run_event_at(
            &mut world,
            repositioning_system,
            15 * ONE_MIN_MS,
            EventKind::RepositionRun,
            None,
        );
        assert_eq!(world.resource::<FleetMetrics>().repositions.len(), 2);
    }
}
