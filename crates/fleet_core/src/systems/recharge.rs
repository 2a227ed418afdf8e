//! Refuel and recharge flow.
//!
//! `NeedRecharge` plans a stop and sends the vehicle off, `StationArrival` checks the
//! vehicle actually stands on the planned station, `RechargeStart` and `RechargeEnd`
//! bracket the refuel itself. A request queued behind the stop is started once the
//! vehicle is full again.
//!
//! Under the during-trip policy a vehicle that cannot finish its trip gets the stop
//! spliced into the trip's route instead; the trip waits at the station while the
//! vehicle refuels and then drives on.

use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{
    hours_to_ms, CurrentEvent, EventKind, EventSubject, SimulationClock, RECHARGE_PRIORITY,
};
use crate::config::SimulationConfig;
use crate::fleet::{Fleet, Vehicle, VehicleId, VehicleState};
use crate::graph::CityGraph;
use crate::lifecycle::TripManager;
use crate::metrics::{FleetMetrics, RechargeRecord};
use crate::policies::{validate_plan, RechargePolicy};
use crate::requests::{RequestBook, RequestState};
use crate::routing::{RouteStrategy, Router};
use crate::systems::schedule_trip_events;
use crate::trip::TripPurpose;

fn event_vehicle(event: &CurrentEvent) -> Option<VehicleId> {
    match event.0.subject {
        Some(EventSubject::Vehicle(id)) => Some(id),
        _ => None,
    }
}

/// Takes the vehicle out of service and fails whatever was waiting on it.
fn strand(
    vehicle: &mut Vehicle,
    requests: &mut RequestBook,
    metrics: &mut FleetMetrics,
    now: u64,
    penalty: f64,
) {
    vehicle.state = VehicleState::Unavailable;
    vehicle.pending_plan = None;
    metrics.record_stranded(now, vehicle.id);
    if let Some(request) = vehicle.queued_request.take() {
        requests.reject(request);
        metrics.record_start_failed(request, now, penalty);
    }
}

/// Splices a refuel stop into the single active trip of `vehicle`.
fn plan_stop_on_the_way(
    clock: &mut SimulationClock,
    graph: &CityGraph,
    router: &dyn RouteStrategy,
    recharge: &RechargePolicy,
    vehicle: &mut Vehicle,
    trips: &mut TripManager,
) {
    if vehicle.pending_plan.is_some() || vehicle.state != VehicleState::EnRoute {
        return;
    }
    let &[trip_id] = trips.active_for(vehicle.id) else {
        log::debug!("vehicle {} carries shared trips, recharge deferred", vehicle.label);
        return;
    };
    let Some(trip) = trips.get(trip_id) else {
        return;
    };
    let Some(found) = recharge.plan_en_route(vehicle, graph, router, trip) else {
        log::warn!(
            "vehicle {} found no station on the way ({:.1} km left)",
            vehicle.label,
            vehicle.autonomy_km
        );
        return;
    };
    if let Err(rejection) = validate_plan(&found.plan, vehicle, graph) {
        log::warn!("stop for vehicle {} discarded: {}", vehicle.label, rejection);
        return;
    }

    if found.route_to_client.len() < 2 {
        log::info!(
            "vehicle {} will refuel at {} when its trip ends",
            vehicle.label,
            found.plan.station
        );
        vehicle.pending_plan = Some(found.plan);
        return;
    }

    let stop_offset = found.plan.route.len() - 1;
    let mut tail = found.plan.route.clone();
    tail.extend(found.route_to_client.iter().skip(1).cloned());
    let hours = found.plan.recharge_minutes / 60.0;
    let Some(delta) = trips.splice_stop(trip_id, graph, &tail, stop_offset, hours) else {
        log::warn!("trip {} of vehicle {} refused the station stop", trip_id.0, vehicle.label);
        return;
    };
    log::info!(
        "vehicle {} stops at {} on the way ({:+.1} min, {:.0} min refuel)",
        vehicle.label,
        found.plan.station,
        delta.minutes_delta(),
        found.plan.recharge_minutes
    );
    vehicle.pending_plan = Some(found.plan);
    if let Some(trip) = trips.get(trip_id) {
        schedule_trip_events(clock, trip);
    }
}

/// Plans and commits a recharge stop for an idle vehicle, or on the way for a vehicle
/// driving under the during-trip policy.
#[allow(clippy::too_many_arguments)]
pub fn need_recharge_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    graph: Res<CityGraph>,
    router: Res<Router>,
    recharge: Res<RechargePolicy>,
    config: Res<SimulationConfig>,
    mut fleet: ResMut<Fleet>,
    mut requests: ResMut<RequestBook>,
    mut trips: ResMut<TripManager>,
    mut metrics: ResMut<FleetMetrics>,
) {
    let Some(id) = event_vehicle(&event) else {
        return;
    };
    let now = clock.now();
    let Some(vehicle) = fleet.get_mut(id) else {
        return;
    };
    if trips.has_active(id) {
        if matches!(*recharge, RechargePolicy::DuringTrip { .. }) {
            plan_stop_on_the_way(&mut clock, &graph, &**router, &recharge, vehicle, &mut trips);
        } else {
            log::debug!("vehicle {} still driving, recharge deferred", vehicle.label);
        }
        return;
    }
    if vehicle.pending_plan.is_some() || vehicle.state != VehicleState::Available {
        return;
    }

    let Some(plan) = recharge.plan(vehicle, &graph, &**router) else {
        if vehicle.autonomy_km <= 0.0 {
            log::warn!("vehicle {} is empty with no reachable station", vehicle.label);
            strand(vehicle, &mut requests, &mut metrics, now, config.rejection_penalty);
        } else {
            log::warn!(
                "vehicle {} found no reachable station ({:.1} km left)",
                vehicle.label,
                vehicle.autonomy_km
            );
        }
        return;
    };
    if let Err(rejection) = validate_plan(&plan, vehicle, &graph) {
        log::warn!("recharge plan for vehicle {} discarded: {}", vehicle.label, rejection);
        strand(vehicle, &mut requests, &mut metrics, now, config.rejection_penalty);
        return;
    }

    if plan.route.len() < 2 {
        vehicle.state = VehicleState::Refueling;
        clock.schedule_with_priority(
            now,
            EventKind::RechargeStart,
            RECHARGE_PRIORITY,
            Some(EventSubject::Vehicle(id)),
        );
    } else {
        let purpose = TripPurpose::ToStation {
            station: plan.station.clone(),
        };
        match trips.start(&graph, vehicle, purpose, plan.route.clone(), 0, now) {
            Ok(trip) => {
                if let Some(trip) = trips.get(trip) {
                    schedule_trip_events(&mut clock, trip);
                }
            }
            Err(err) => {
                log::warn!(
                    "vehicle {} could not head to {}: {:?}",
                    vehicle.label,
                    plan.station,
                    err
                );
                return;
            }
        }
    }
    log::info!(
        "vehicle {} heads to {} ({:.2} km, {:.0} min refuel)",
        vehicle.label,
        plan.station,
        plan.distance_km,
        plan.recharge_minutes
    );
    vehicle.pending_plan = Some(plan);
}

/// Confirms a vehicle reached its planned station and queues the refuel.
///
/// A vehicle whose trip has a refuel stop still ahead has not arrived yet: the event
/// was booked before a reroute and a fresh one is already on the clock.
#[allow(clippy::too_many_arguments)]
pub fn station_arrival_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    graph: Res<CityGraph>,
    config: Res<SimulationConfig>,
    trips: Res<TripManager>,
    mut fleet: ResMut<Fleet>,
    mut requests: ResMut<RequestBook>,
    mut metrics: ResMut<FleetMetrics>,
) {
    let Some(id) = event_vehicle(&event) else {
        return;
    };
    let now = clock.now();
    let Some(vehicle) = fleet.get_mut(id) else {
        return;
    };
    if vehicle.state == VehicleState::Refueling || vehicle.pending_plan.is_none() {
        log::debug!("vehicle {} has no station stop to arrive at", vehicle.label);
        return;
    }
    if trips.active_trips(id).any(|trip| trip.stop_ahead().is_some() && !trip.at_stop()) {
        log::debug!("stale station arrival for vehicle {}", vehicle.label);
        return;
    }
    let on_station = vehicle
        .pending_plan
        .as_ref()
        .is_some_and(|plan| plan.station == vehicle.location)
        && vehicle.can_refuel_at(&graph, &vehicle.location);
    if !on_station {
        log::warn!(
            "vehicle {} arrived at {} which is not its planned station",
            vehicle.label,
            vehicle.location
        );
        strand(vehicle, &mut requests, &mut metrics, now, config.rejection_penalty);
        return;
    }
    vehicle.state = VehicleState::Refueling;
    clock.schedule_with_priority(
        now,
        EventKind::RechargeStart,
        RECHARGE_PRIORITY,
        Some(EventSubject::Vehicle(id)),
    );
}

/// Starts refuelling and schedules its end.
pub fn recharge_start_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut fleet: ResMut<Fleet>,
) {
    let Some(id) = event_vehicle(&event) else {
        return;
    };
    let Some(vehicle) = fleet.get_mut(id) else {
        return;
    };
    if vehicle.pending_plan.is_none() {
        log::warn!("vehicle {} asked to refuel without a plan", vehicle.label);
        return;
    }
    vehicle.state = VehicleState::Refueling;
    let minutes = vehicle.refuel_minutes();
    let end = clock.now() + hours_to_ms(minutes / 60.0);
    log::debug!("vehicle {} refuels for {:.1} min at {}", vehicle.label, minutes, vehicle.location);
    clock.schedule_with_priority(
        end,
        EventKind::RechargeEnd,
        RECHARGE_PRIORITY,
        Some(EventSubject::Vehicle(id)),
    );
}

/// Finishes a refuel and starts the request queued behind it, if any.
#[allow(clippy::too_many_arguments)]
pub fn recharge_end_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    graph: Res<CityGraph>,
    router: Res<Router>,
    config: Res<SimulationConfig>,
    mut fleet: ResMut<Fleet>,
    mut requests: ResMut<RequestBook>,
    mut trips: ResMut<TripManager>,
    mut metrics: ResMut<FleetMetrics>,
) {
    let Some(id) = event_vehicle(&event) else {
        return;
    };
    let now = clock.now();
    let Some(vehicle) = fleet.get_mut(id) else {
        return;
    };
    if vehicle.state != VehicleState::Refueling {
        return;
    }

    let minutes = vehicle.refuel_minutes();
    let added = vehicle.refill();
    vehicle.state = if trips.has_active(id) {
        VehicleState::EnRoute
    } else {
        VehicleState::Available
    };
    vehicle.pending_plan = None;
    metrics.record_recharge(RechargeRecord {
        at: now,
        vehicle: id,
        station: vehicle.location.clone(),
        minutes,
        autonomy_added_km: added,
    });
    log::info!("vehicle {} refuelled at {} (+{:.1} km)", vehicle.label, vehicle.location, added);

    let Some(request_id) = vehicle.queued_request.take() else {
        return;
    };
    let Some(request) = requests.get(request_id).cloned() else {
        return;
    };
    if request.state != RequestState::InProgress {
        log::debug!("queued request {} is no longer waiting", request_id.0);
        return;
    }

    let to_client = router.route(&graph, &vehicle.location, &request.origin, Some(&*vehicle));
    let to_destination = router
        .route(&graph, &request.origin, &request.destination, None)
        .filter(|route| route.len() >= 2);
    let started = match (to_client, to_destination) {
        (Some(mut route), Some(ride)) => {
            let pickup_index = route.len().saturating_sub(1);
            route.extend(ride.into_iter().skip(1));
            let purpose = TripPurpose::Passenger {
                request: request_id,
                passengers: request.passengers,
            };
            trips
                .start(&graph, vehicle, purpose, route, pickup_index, now)
                .map_err(|err| format!("{err:?}"))
        }
        _ => Err("no route".to_string()),
    };
    match started {
        Ok(trip) => {
            if let Some(trip) = trips.get(trip) {
                schedule_trip_events(&mut clock, trip);
            }
            log::info!("vehicle {} resumes request {}", vehicle.label, request_id.0);
        }
        Err(reason) => {
            log::warn!(
                "vehicle {} could not resume request {}: {}",
                vehicle.label,
                request_id.0,
                reason
            );
            requests.reject(request_id);
            metrics.record_start_failed(request_id, now, config.rejection_penalty);
        }
    }
}
