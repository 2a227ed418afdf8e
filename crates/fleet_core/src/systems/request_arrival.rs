use bevy_ecs::prelude::{Res, ResMut};

use crate::allocation::{AllocationContext, AllocatorResource, Approach};
use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock, RECHARGE_PRIORITY};
use crate::config::SimulationConfig;
use crate::cost::emissions_kg;
use crate::fleet::{Fleet, Vehicle, VehicleState};
use crate::graph::CityGraph;
use crate::lifecycle::TripManager;
use crate::metrics::{FleetMetrics, RejectionReason, TripRecord};
use crate::policies::{validate_plan, RechargePolicy, RideSharingPolicy};
use crate::requests::{RequestBook, RequestId, RequestState};
use crate::routing::Router;
use crate::systems::schedule_trip_events;
use crate::trip::TripPurpose;

fn reject(
    requests: &mut RequestBook,
    metrics: &mut FleetMetrics,
    request: RequestId,
    at: u64,
    reason: RejectionReason,
    penalty: f64,
) {
    log::info!("request {} rejected: {}", request.0, reason);
    requests.reject(request);
    metrics.record_rejected(request, at, reason, penalty);
}

/// Allocates a vehicle to an arriving request and starts serving it.
///
/// A direct allocation starts the trip at once, a shared one rides along the vehicle's
/// current trip, and a station stop sends the vehicle to refuel first with the request
/// queued on it. Requests that were withdrawn before arriving are ignored.
#[allow(clippy::too_many_arguments)]
pub fn request_arrival_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    graph: Res<CityGraph>,
    router: Res<Router>,
    allocator: Res<AllocatorResource>,
    recharge: Res<RechargePolicy>,
    ridesharing: Res<RideSharingPolicy>,
    config: Res<SimulationConfig>,
    mut fleet: ResMut<Fleet>,
    mut requests: ResMut<RequestBook>,
    mut trips: ResMut<TripManager>,
    mut metrics: ResMut<FleetMetrics>,
) {
    let Some(EventSubject::Request(id)) = event.0.subject else {
        return;
    };
    let now = clock.now();
    let Some(request) = requests.get(id).cloned() else {
        log::warn!("arrival for unknown request {}", id.0);
        return;
    };
    if request.state != RequestState::Pending {
        log::debug!("request {} arrived in state {:?}, ignoring", id.0, request.state);
        return;
    }
    let penalty = config.rejection_penalty;

    let Some(request_route) = router
        .route(&graph, &request.origin, &request.destination, None)
        .filter(|route| route.len() >= 2)
    else {
        reject(&mut requests, &mut metrics, id, now, RejectionReason::RouteNotFound, penalty);
        return;
    };
    let request_distance = graph.route_distance(&request_route);

    let allocation = {
        let candidates: Vec<&Vehicle> = fleet
            .iter()
            .filter(|v| matches!(v.state, VehicleState::Available | VehicleState::EnRoute))
            .collect();
        let ctx = AllocationContext {
            graph: &graph,
            router: &**router,
            trips: &trips,
            recharge: &recharge,
            ridesharing: &ridesharing,
            heuristic: config.heuristic,
        };
        allocator.select_vehicle(&request, &candidates, &ctx, &request_route, request_distance)
    };
    let Some(allocation) = allocation else {
        reject(&mut requests, &mut metrics, id, now, RejectionReason::NoFeasibleVehicle, penalty);
        return;
    };
    let Some(vehicle) = fleet.get_mut(allocation.vehicle) else {
        return;
    };

    let purpose = TripPurpose::Passenger {
        request: id,
        passengers: request.passengers,
    };
    let response_hours;
    let mut distance_km = request_distance;
    let mut shared = false;

    match &allocation.approach {
        Approach::Direct { route_to_client } => {
            let pickup_index = route_to_client.len().saturating_sub(1);
            let mut route = route_to_client.clone();
            route.extend(request_route.iter().skip(1).cloned());
            match trips.start(&graph, vehicle, purpose, route, pickup_index, now) {
                Ok(trip) => {
                    if let Some(trip) = trips.get(trip) {
                        schedule_trip_events(&mut clock, trip);
                    }
                }
                Err(err) => {
                    log::warn!(
                        "vehicle {} could not start request {}: {:?}",
                        vehicle.label,
                        id.0,
                        err
                    );
                    reject(
                        &mut requests,
                        &mut metrics,
                        id,
                        now,
                        RejectionReason::TripStartFailed,
                        penalty,
                    );
                    return;
                }
            }
            response_hours = graph.route_time(route_to_client);
        }
        Approach::Shared(plan) => {
            match trips.start_shared(
                &graph,
                vehicle,
                plan.host,
                purpose,
                plan.route.clone(),
                plan.pickup_index,
                now,
            ) {
                Ok(trip) => {
                    let Some(trip) = trips.get(trip) else {
                        return;
                    };
                    response_hours = trip.hours_until(trip.pickup_index);
                    schedule_trip_events(&mut clock, trip);
                }
                Err(err) => {
                    log::warn!(
                        "vehicle {} could not share request {}: {:?}",
                        vehicle.label,
                        id.0,
                        err
                    );
                    reject(
                        &mut requests,
                        &mut metrics,
                        id,
                        now,
                        RejectionReason::TripStartFailed,
                        penalty,
                    );
                    return;
                }
            }
            distance_km = plan.request_distance;
            shared = true;
        }
        Approach::ViaStation(plan) => {
            if let Err(rejection) = validate_plan(&plan.plan, vehicle, &graph) {
                log::warn!("station stop for vehicle {} refused: {}", vehicle.label, rejection);
                reject(
                    &mut requests,
                    &mut metrics,
                    id,
                    now,
                    RejectionReason::TripStartFailed,
                    penalty,
                );
                return;
            }
            if plan.plan.route.len() < 2 {
                vehicle.state = VehicleState::Refueling;
                clock.schedule_with_priority(
                    now,
                    EventKind::RechargeStart,
                    RECHARGE_PRIORITY,
                    Some(EventSubject::Vehicle(vehicle.id)),
                );
            } else {
                let to_station = TripPurpose::ToStation {
                    station: plan.plan.station.clone(),
                };
                match trips.start(&graph, vehicle, to_station, plan.plan.route.clone(), 0, now) {
                    Ok(trip) => {
                        if let Some(trip) = trips.get(trip) {
                            schedule_trip_events(&mut clock, trip);
                        }
                    }
                    Err(err) => {
                        log::warn!(
                            "vehicle {} could not head to {}: {:?}",
                            vehicle.label,
                            plan.plan.station,
                            err
                        );
                        reject(
                            &mut requests,
                            &mut metrics,
                            id,
                            now,
                            RejectionReason::TripStartFailed,
                            penalty,
                        );
                        return;
                    }
                }
            }
            log::info!(
                "vehicle {} refuels at {} before request {}",
                vehicle.label,
                plan.plan.station,
                id.0
            );
            vehicle.pending_plan = Some(plan.plan.clone());
            vehicle.queued_request = Some(id);
            response_hours = plan.plan.total_hours() + graph.route_time(&plan.route_to_client);
        }
    }

    if let Some(request) = requests.get_mut(id) {
        request.assign(vehicle.id);
    }
    let cost = distance_km * vehicle.cost_per_km + allocation.recharge_cost();
    log::info!(
        "request {} -> vehicle {} ({:.2} km to client, {:.2} km trip)",
        id.0,
        vehicle.label,
        allocation.distance_to_client,
        distance_km
    );
    metrics.record_accepted(TripRecord {
        request: id,
        vehicle: vehicle.id,
        accepted_at: now,
        response_minutes: response_hours * 60.0,
        distance_km,
        cost,
        emissions_kg: emissions_kg(&vehicle.propulsion, distance_km),
        shared,
        picked_up_at: None,
        completed_at: None,
    });
}
