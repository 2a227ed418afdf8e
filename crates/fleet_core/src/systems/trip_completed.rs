use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock, RECHARGE_PRIORITY};
use crate::fleet::{Fleet, VehicleState};
use crate::lifecycle::TripManager;
use crate::metrics::FleetMetrics;
use crate::policies::RechargePolicy;
use crate::requests::RequestBook;
use crate::trip::TripPurpose;

/// Detaches a finished trip and decides what the vehicle does next.
///
/// Completion events left behind by a reroute are stale and ignored. A trip to a station
/// hands over to the station arrival, and so does a trip ending on the station planned
/// for the vehicle while it drove. Otherwise, once the vehicle has no active trip left,
/// it is either sent for a recharge check or, with an empty tank and nothing to plan,
/// taken out of service.
pub fn trip_completed_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    recharge: Res<RechargePolicy>,
    mut fleet: ResMut<Fleet>,
    mut requests: ResMut<RequestBook>,
    mut trips: ResMut<TripManager>,
    mut metrics: ResMut<FleetMetrics>,
) {
    let Some(EventSubject::Trip(id)) = event.0.subject else {
        return;
    };
    let now = clock.now();
    let Some(vehicle_id) = trips.get(id).map(|trip| trip.vehicle) else {
        return;
    };
    let Some(vehicle) = fleet.get_mut(vehicle_id) else {
        return;
    };
    let Some(trip) = trips.conclude(id, vehicle) else {
        log::debug!("stale completion for trip {}", id.0);
        return;
    };
    let purpose = trip.purpose.clone();
    let distance = trip.total_distance;

    match purpose {
        TripPurpose::Passenger { request, .. } => {
            requests.complete(request);
            metrics.record_trip_concluded(request, now);
            log::info!(
                "vehicle {} completed request {} at {} ({:.2} km)",
                vehicle.label,
                request.0,
                vehicle.location,
                distance
            );
        }
        TripPurpose::ToStation { station } => {
            log::debug!("vehicle {} reached station {}", vehicle.label, station);
            clock.schedule_with_priority(
                now,
                EventKind::StationArrival,
                RECHARGE_PRIORITY,
                Some(EventSubject::Vehicle(vehicle_id)),
            );
            return;
        }
        TripPurpose::Reposition => {
            log::debug!("vehicle {} repositioned to {}", vehicle.label, vehicle.location);
        }
    }

    if trips.has_active(vehicle_id) {
        return;
    }
    if vehicle.pending_plan.as_ref().is_some_and(|plan| plan.station == vehicle.location) {
        clock.schedule_with_priority(
            now,
            EventKind::StationArrival,
            RECHARGE_PRIORITY,
            Some(EventSubject::Vehicle(vehicle_id)),
        );
    } else if recharge.should_schedule(vehicle, &trips) {
        clock.schedule_with_priority(
            now,
            EventKind::NeedRecharge,
            RECHARGE_PRIORITY,
            Some(EventSubject::Vehicle(vehicle_id)),
        );
    } else if vehicle.autonomy_km <= 0.0 && vehicle.state == VehicleState::Available {
        log::warn!("vehicle {} ran out of autonomy at {}", vehicle.label, vehicle.location);
        vehicle.state = VehicleState::Unavailable;
        metrics.record_stranded(now, vehicle_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::prelude::IntoSystemConfigs;

    use crate::clock::ONE_HOUR_MS;
    use crate::fleet::VehicleId;
    use crate::requests::{RequestId, RequestState};
    use crate::systems::progress::trip_progress_system;
    use crate::test_helpers::{chain_world, run_event_at, start_passenger_trip};

    fn complete(world: &mut bevy_ecs::prelude::World, trip: crate::trip::TripId, at: u64) {
        run_event_at(
            world,
            (trip_progress_system, trip_completed_system).chain(),
            at,
            EventKind::TripCompleted,
            Some(EventSubject::Trip(trip)),
        );
    }

    #[test]
    fn completion_frees_vehicle_and_request_once() {
        let mut world = chain_world();
        let trip = start_passenger_trip(&mut world, VehicleId(0), RequestId(1), &["B", "C"], 0);

        complete(&mut world, trip, ONE_HOUR_MS / 2);
        assert_eq!(world.resource::<FleetMetrics>().completed, 0, "still driving");

        complete(&mut world, trip, ONE_HOUR_MS);
        complete(&mut world, trip, ONE_HOUR_MS);
        let metrics = world.resource::<FleetMetrics>();
        assert_eq!(metrics.completed, 1);
        assert_eq!(metrics.trips[0].completed_at, Some(ONE_HOUR_MS));

        let vehicle = world.resource::<Fleet>().get(VehicleId(0)).unwrap().clone();
        assert_eq!(vehicle.state, VehicleState::Available);
        assert_eq!(vehicle.location, "C");
        assert_eq!(vehicle.passengers, 0);
        assert_eq!(
            world.resource::<RequestBook>().get(RequestId(1)).unwrap().state,
            RequestState::Completed
        );
    }

    #[test]
    fn empty_tank_without_recharge_strands_vehicle() {
        let mut world = chain_world();
        world.insert_resource(RechargePolicy::Disabled);
        world
            .resource_mut::<Fleet>()
            .get_mut(VehicleId(0))
            .unwrap()
            .autonomy_km = 1.0;
        let trip = start_passenger_trip(&mut world, VehicleId(0), RequestId(1), &["B", "C"], 0);

        complete(&mut world, trip, ONE_HOUR_MS);
        let vehicle = world.resource::<Fleet>().get(VehicleId(0)).unwrap().clone();
        assert_eq!(vehicle.state, VehicleState::Unavailable);
        assert_eq!(world.resource::<FleetMetrics>().stranded, vec![(ONE_HOUR_MS, VehicleId(0))]);
    }

    #[test]
    fn low_vehicle_asks_for_recharge() {
        let mut world = chain_world();
        world
            .resource_mut::<Fleet>()
            .get_mut(VehicleId(0))
            .unwrap()
            .autonomy_km = 10.0;
        let trip = start_passenger_trip(&mut world, VehicleId(0), RequestId(1), &["B", "C"], 0);

        complete(&mut world, trip, ONE_HOUR_MS);
        let next = world.resource_mut::<SimulationClock>().pop_next().expect("event");
        assert_eq!(next.kind, EventKind::NeedRecharge);
        assert_eq!(next.subject, Some(EventSubject::Vehicle(VehicleId(0))));
    }
}
