use crate::cost::Heuristic;
use crate::fleet::{Vehicle, VehicleId, VehicleState};
use crate::graph::{CityGraph, Route};
use crate::lifecycle::TripManager;
use crate::policies::{InterleavedPlan, RechargePolicy, RideSharingPolicy, SharedRoute};
use crate::requests::Request;
use crate::routing::RouteStrategy;

/// Read-only view of the world handed to allocation strategies.
#[derive(Clone, Copy)]
pub struct AllocationContext<'a> {
    pub graph: &'a CityGraph,
    pub router: &'a dyn RouteStrategy,
    pub trips: &'a TripManager,
    pub recharge: &'a RechargePolicy,
    pub ridesharing: &'a RideSharingPolicy,
    pub heuristic: Heuristic,
}

/// How the chosen vehicle reaches the client.
#[derive(Debug, Clone, PartialEq)]
pub enum Approach {
    /// Idle vehicle drives straight from its location.
    Direct { route_to_client: Route },
    /// Vehicle already carrying passengers picks the client up on its way.
    Shared(SharedRoute),
    /// Vehicle refuels at a station first, then drives to the client.
    ViaStation(InterleavedPlan),
}

/// A feasible vehicle for a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub vehicle: VehicleId,
    /// Distance the vehicle drives before reaching the client, station stop included.
    pub distance_to_client: f64,
    pub approach: Approach,
}

impl Allocation {
    pub fn route_to_client(&self) -> &[String] {
        match &self.approach {
            Approach::Direct { route_to_client } => route_to_client,
            Approach::Shared(shared) => &shared.route[..=shared.pickup_index],
            Approach::ViaStation(plan) => &plan.route_to_client,
        }
    }

    /// Extra cost of a station stop, zero otherwise.
    pub fn recharge_cost(&self) -> f64 {
        match &self.approach {
            Approach::ViaStation(plan) => plan.plan.extra_cost,
            _ => 0.0,
        }
    }
}

/// Checks one candidate against capacity, reachability and autonomy.
///
/// Idle vehicles are routed from their location to the origin. Vehicles en route only
/// qualify for ride-sharing requests whose origin lies ahead on their route, and not
/// while a refuel stop is planned for them. An idle vehicle short on autonomy may still
/// qualify through an interleaved station stop.
pub fn evaluate_candidate(
    vehicle: &Vehicle,
    request: &Request,
    ctx: &AllocationContext<'_>,
    request_distance: f64,
) -> Option<Allocation> {
    if !vehicle.has_capacity_for(request.passengers) {
        return None;
    }

    match vehicle.state {
        VehicleState::Available if !ctx.trips.has_active(vehicle.id) => {
            let route_to_client =
                ctx.router
                    .route(ctx.graph, &vehicle.location, &request.origin, Some(vehicle))?;
            let distance_to_client = ctx.graph.route_distance(&route_to_client);

            if vehicle.autonomy_km >= distance_to_client + request_distance {
                return Some(Allocation {
                    vehicle: vehicle.id,
                    distance_to_client,
                    approach: Approach::Direct { route_to_client },
                });
            }

            let plan = ctx.recharge.plan_interleaved(
                vehicle,
                ctx.graph,
                ctx.router,
                &request.origin,
                request_distance,
            )?;
            Some(Allocation {
                vehicle: vehicle.id,
                distance_to_client: plan.plan.distance_km + plan.distance_to_client,
                approach: Approach::ViaStation(plan),
            })
        }
        VehicleState::EnRoute if request.ride_sharing && vehicle.pending_plan.is_none() => {
            if !ctx
                .ridesharing
                .passes_through(ctx.trips, vehicle.id, &request.origin)
            {
                return None;
            }
            let shared = ctx.ridesharing.adjust_routes(
                ctx.trips,
                vehicle.id,
                &request.origin,
                &request.destination,
                ctx.graph,
                ctx.router,
            )?;
            if vehicle.autonomy_km < shared.distance_to_client + shared.request_distance {
                return None;
            }
            Some(Allocation {
                vehicle: vehicle.id,
                distance_to_client: shared.distance_to_client,
                approach: Approach::Shared(shared),
            })
        }
        _ => None,
    }
}
