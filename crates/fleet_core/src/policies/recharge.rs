//! Refuel and recharge planning.
//!
//! Planning is pure: it inspects the vehicle and the graph and returns a
//! [RechargePlan] by value. Committing a plan (starting the trip to the station,
//! scheduling the recharge) is done by the recharge systems after [validate_plan].

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fleet::{refuel_minutes, RechargePlan, Vehicle, VehicleState};
use crate::graph::{CityGraph, Route};
use crate::lifecycle::TripManager;
use crate::routing::RouteStrategy;
use crate::trip::Trip;

/// Autonomy percentage at or below which a vehicle needs to refuel.
pub const DEFAULT_CRITICAL_PCT: f64 = 20.0;
/// Extra distance kept in reserve when checking an active trip against autonomy.
pub const DEFAULT_SAFETY_MARGIN_KM: f64 = 10.0;
/// Share of the per-km operating cost charged per minute spent refuelling.
const IDLE_COST_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Resource)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RechargePolicy {
    /// Vehicles never refuel; they become unavailable once autonomy runs out.
    Disabled,
    /// Refuel idle vehicles whose autonomy is at or below `critical_pct`.
    Automatic { critical_pct: f64 },
    /// Like `Automatic`, but also while a trip is active when the latest trip's
    /// remaining distance plus `safety_margin_km` exceeds the autonomy.
    DuringTrip {
        critical_pct: f64,
        safety_margin_km: f64,
    },
}

impl Default for RechargePolicy {
    fn default() -> Self {
        RechargePolicy::Automatic {
            critical_pct: DEFAULT_CRITICAL_PCT,
        }
    }
}

/// Plan that visits a station before serving a request.
#[derive(Debug, Clone, PartialEq)]
pub struct InterleavedPlan {
    pub plan: RechargePlan,
    /// Station to request origin.
    pub route_to_client: Route,
    pub distance_to_client: f64,
}

/// Reason a plan was refused right before being committed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanRejection {
    #[error("plan is not feasible")]
    Infeasible,
    #[error("vehicle is already refuelling")]
    AlreadyRefueling,
    #[error("needs {required:.1} km to reach the station, has {available:.1} km")]
    InsufficientAutonomy { required: f64, available: f64 },
    #[error("station '{0}' does not exist")]
    MissingStation(String),
    #[error("station '{0}' does not serve this vehicle")]
    WrongStationKind(String),
}

impl RechargePolicy {
    pub fn name(&self) -> &'static str {
        match self {
            RechargePolicy::Disabled => "disabled",
            RechargePolicy::Automatic { .. } => "automatic",
            RechargePolicy::DuringTrip { .. } => "during_trip",
        }
    }

    pub fn allows_recharge(&self) -> bool {
        !matches!(self, RechargePolicy::Disabled)
    }

    fn safety_margin_km(&self) -> f64 {
        match self {
            RechargePolicy::DuringTrip {
                safety_margin_km, ..
            } => *safety_margin_km,
            _ => 0.0,
        }
    }

    /// Whether `vehicle` should be sent to refuel now.
    pub fn should_schedule(&self, vehicle: &Vehicle, trips: &TripManager) -> bool {
        if matches!(
            vehicle.state,
            VehicleState::Refueling | VehicleState::Maintenance
        ) || vehicle.pending_plan.is_some()
        {
            return false;
        }
        match self {
            RechargePolicy::Disabled => false,
            RechargePolicy::Automatic { critical_pct } => {
                !trips.has_active(vehicle.id) && vehicle.needs_refuel(*critical_pct)
            }
            RechargePolicy::DuringTrip {
                critical_pct,
                safety_margin_km,
            } => {
                if vehicle.needs_refuel(*critical_pct) {
                    return true;
                }
                trips.latest_active(vehicle.id).is_some_and(|trip| {
                    vehicle.autonomy_km < trip.remaining_distance() + safety_margin_km
                })
            }
        }
    }

    /// Cheapest compatible station reachable with the current autonomy.
    ///
    /// A vehicle already standing on a compatible station gets a zero-distance plan.
    pub fn plan(
        &self,
        vehicle: &Vehicle,
        graph: &CityGraph,
        router: &dyn RouteStrategy,
    ) -> Option<RechargePlan> {
        if !self.allows_recharge() {
            return None;
        }
        let station_kind = vehicle.propulsion.station_kind();

        if vehicle.can_refuel_at(graph, &vehicle.location) {
            let minutes = vehicle.refuel_minutes();
            return Some(RechargePlan {
                station: vehicle.location.clone(),
                station_kind,
                route: vec![vehicle.location.clone()],
                distance_km: 0.0,
                travel_hours: 0.0,
                recharge_minutes: minutes,
                extra_cost: minutes * vehicle.cost_per_km * IDLE_COST_FACTOR,
                required_autonomy_km: 0.0,
                safety_margin_km: 0.0,
            });
        }

        let mut best: Option<RechargePlan> = None;
        for station in graph.stations_of_kind(station_kind) {
            let Some(route) =
                router.route(graph, &vehicle.location, &station.name, Some(vehicle))
            else {
                continue;
            };
            let distance_km = graph.route_distance(&route);
            if distance_km > vehicle.autonomy_km {
                continue;
            }
            let travel_hours = graph.route_time(&route);
            if !travel_hours.is_finite() {
                continue;
            }
            let remaining = (vehicle.autonomy_km - distance_km).max(0.0);
            let minutes = refuel_minutes(&vehicle.propulsion, vehicle.max_autonomy_km - remaining);
            let extra_cost = distance_km * vehicle.cost_per_km
                + minutes * vehicle.cost_per_km * IDLE_COST_FACTOR;

            if best.as_ref().map_or(true, |b| extra_cost < b.extra_cost) {
                best = Some(RechargePlan {
                    station: station.name.clone(),
                    station_kind,
                    route,
                    distance_km,
                    travel_hours,
                    recharge_minutes: minutes,
                    extra_cost,
                    required_autonomy_km: distance_km,
                    safety_margin_km: self.safety_margin_km(),
                });
            }
        }
        best
    }

    /// Station stop that lets `vehicle` serve a request it cannot reach on its current
    /// autonomy: the station must be reachable now, and after a full refill the
    /// station-to-origin leg plus `request_distance` must fit in the maximum autonomy.
    pub fn plan_interleaved(
        &self,
        vehicle: &Vehicle,
        graph: &CityGraph,
        router: &dyn RouteStrategy,
        origin: &str,
        request_distance: f64,
    ) -> Option<InterleavedPlan> {
        if !self.allows_recharge() {
            return None;
        }
        let station_kind = vehicle.propulsion.station_kind();

        let mut best: Option<InterleavedPlan> = None;
        for station in graph.stations_of_kind(station_kind) {
            let Some(to_station) =
                router.route(graph, &vehicle.location, &station.name, Some(vehicle))
            else {
                continue;
            };
            let distance_km = graph.route_distance(&to_station);
            if distance_km > vehicle.autonomy_km {
                continue;
            }
            let Some(to_client) = router.route(graph, &station.name, origin, Some(vehicle)) else {
                continue;
            };
            let distance_to_client = graph.route_distance(&to_client);
            if distance_to_client + request_distance > vehicle.max_autonomy_km {
                continue;
            }
            let travel_hours = graph.route_time(&to_station);
            if !travel_hours.is_finite() {
                continue;
            }

            let remaining = (vehicle.autonomy_km - distance_km).max(0.0);
            let minutes = refuel_minutes(&vehicle.propulsion, vehicle.max_autonomy_km - remaining);
            let extra_cost = (distance_km + distance_to_client) * vehicle.cost_per_km
                + minutes * vehicle.cost_per_km * IDLE_COST_FACTOR;

            if best
                .as_ref()
                .map_or(true, |b| extra_cost < b.plan.extra_cost)
            {
                best = Some(InterleavedPlan {
                    plan: RechargePlan {
                        station: station.name.clone(),
                        station_kind,
                        route: to_station,
                        distance_km,
                        travel_hours,
                        recharge_minutes: minutes,
                        extra_cost,
                        required_autonomy_km: distance_km,
                        safety_margin_km: self.safety_margin_km(),
                    },
                    route_to_client: to_client,
                    distance_to_client,
                });
            }
        }
        best
    }

    /// Station stop on the way for a vehicle driving `trip`: from the trip's next node
    /// to a station, then on to the trip's destination.
    ///
    /// The plan's route and distance count from that next node. When the best station
    /// is the destination itself, `route_to_client` is just that node.
    pub fn plan_en_route(
        &self,
        vehicle: &Vehicle,
        graph: &CityGraph,
        router: &dyn RouteStrategy,
        trip: &Trip,
    ) -> Option<InterleavedPlan> {
        let destination = trip.destination()?;
        let anchor = trip.anchor_index();
        let to_anchor = trip
            .segments
            .get(trip.segment_index)
            .filter(|_| trip.distance_in_segment > 0.0)
            .map_or(0.0, |segment| segment.distance_km - trip.distance_in_segment);

        let mut at_anchor = vehicle.clone();
        at_anchor.location = trip.route.get(anchor)?.clone();
        at_anchor.autonomy_km = (vehicle.autonomy_km - to_anchor).max(0.0);

        self.plan_interleaved(&at_anchor, graph, router, destination, 0.0)
    }
}

/// Re-checks a plan against the live vehicle and graph right before it is committed.
pub fn validate_plan(
    plan: &RechargePlan,
    vehicle: &Vehicle,
    graph: &CityGraph,
) -> Result<(), PlanRejection> {
    if !plan.is_feasible() {
        return Err(PlanRejection::Infeasible);
    }
    if vehicle.state == VehicleState::Refueling {
        return Err(PlanRejection::AlreadyRefueling);
    }
    if vehicle.autonomy_km < plan.distance_km {
        return Err(PlanRejection::InsufficientAutonomy {
            required: plan.distance_km,
            available: vehicle.autonomy_km,
        });
    }
    let Some(station) = graph.node_by_name(&plan.station) else {
        return Err(PlanRejection::MissingStation(plan.station.clone()));
    };
    if station.kind != plan.station_kind || station.kind != vehicle.propulsion.station_kind() {
        return Err(PlanRejection::WrongStationKind(plan.station.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CostFunction, Heuristic};
    use crate::fleet::{Propulsion, VehicleId};
    use crate::graph::{EdgeSpec, NodeKind, NodeSpec};
    use crate::routing::{build_router, RouterKind};

    // A --2-- B --3-- F(fuel)    A --4-- E(charging) --20-- F
    fn town() -> CityGraph {
        let mut graph = CityGraph::new(false);
        graph.add_node(NodeSpec::new("A")).unwrap();
        graph.add_node(NodeSpec::new("B")).unwrap();
        graph.add_node(NodeSpec::new("F").with_kind(NodeKind::FuelStation)).unwrap();
        graph.add_node(NodeSpec::new("E").with_kind(NodeKind::ChargingStation)).unwrap();
        graph.add_edge("A", "B", EdgeSpec::new("AB", 2.0, 60.0)).unwrap();
        graph.add_edge("B", "F", EdgeSpec::new("BF", 3.0, 60.0)).unwrap();
        graph.add_edge("A", "E", EdgeSpec::new("AE", 4.0, 60.0)).unwrap();
        graph.add_edge("E", "F", EdgeSpec::new("EF", 20.0, 60.0)).unwrap();
        graph
    }

    fn car(location: &str, autonomy: f64) -> Vehicle {
        Vehicle::new(VehicleId(0), "C1", Propulsion::Combustion, 100.0, 4, 0.2, location)
            .with_autonomy(autonomy)
    }

    fn router() -> Box<dyn RouteStrategy> {
        build_router(RouterKind::UniformCost, CostFunction::Distance, Heuristic::Zero, 0)
    }

    #[test]
    fn automatic_policy_waits_for_idle_vehicles() {
        let policy = RechargePolicy::default();
        let trips = TripManager::default();
        assert!(policy.should_schedule(&car("A", 15.0), &trips));
        assert!(!policy.should_schedule(&car("A", 50.0), &trips));
        assert!(!RechargePolicy::Disabled.should_schedule(&car("A", 1.0), &trips));
    }

    #[test]
    fn plan_picks_compatible_station() {
        let graph = town();
        let router = router();
        let plan = RechargePolicy::default()
            .plan(&car("A", 15.0), &graph, router.as_ref())
            .unwrap();
        assert_eq!(plan.station, "F");
        assert_eq!(plan.route, vec!["A", "B", "F"]);
        assert_eq!(plan.distance_km, 5.0);
        assert!(plan.is_feasible());
        assert!(validate_plan(&plan, &car("A", 15.0), &graph).is_ok());

        let mut ev = car("A", 15.0);
        ev.propulsion = Propulsion::Electric {
            recharge_minutes_per_km: 1.0,
        };
        let plan = RechargePolicy::default().plan(&ev, &graph, router.as_ref()).unwrap();
        assert_eq!(plan.station, "E");
        assert_eq!(plan.recharge_minutes, 89.0);
    }

    #[test]
    fn vehicle_on_station_gets_zero_distance_plan() {
        let graph = town();
        let router = router();
        let plan = RechargePolicy::default()
            .plan(&car("F", 10.0), &graph, router.as_ref())
            .unwrap();
        assert_eq!(plan.distance_km, 0.0);
        assert_eq!(plan.route, vec!["F"]);
        assert!(plan.is_feasible());
    }

    #[test]
    fn unreachable_station_yields_no_plan() {
        let graph = town();
        let router = router();
        assert!(RechargePolicy::default()
            .plan(&car("A", 4.0), &graph, router.as_ref())
            .is_none());
    }

    #[test]
    fn validation_rejects_stale_plans() {
        let graph = town();
        let router = router();
        let vehicle = car("A", 15.0);
        let plan = RechargePolicy::default().plan(&vehicle, &graph, router.as_ref()).unwrap();

        let refueling = vehicle.clone().with_state(VehicleState::Refueling);
        assert_eq!(
            validate_plan(&plan, &refueling, &graph),
            Err(PlanRejection::AlreadyRefueling)
        );
        let drained = vehicle.clone().with_autonomy(3.0);
        assert!(matches!(
            validate_plan(&plan, &drained, &graph),
            Err(PlanRejection::InsufficientAutonomy { .. })
        ));
        let mut wrong = plan.clone();
        wrong.station = "E".into();
        assert_eq!(
            validate_plan(&wrong, &vehicle, &graph),
            Err(PlanRejection::WrongStationKind("E".into()))
        );
    }

    #[test]
    fn interleaved_plan_routes_through_station() {
        let graph = town();
        let router = router();
        // Needs 2 km to reach B plus a 30 km ride: more than 10 km of autonomy.
        let found = RechargePolicy::default()
            .plan_interleaved(&car("A", 10.0), &graph, router.as_ref(), "B", 30.0)
            .unwrap();
        assert_eq!(found.plan.station, "F");
        assert_eq!(found.route_to_client, vec!["F", "B"]);
        assert_eq!(found.distance_to_client, 3.0);
    }

    #[test]
    fn during_trip_policy_uses_safety_margin() {
        let graph = town();
        let mut fleet = crate::fleet::Fleet::default();
        fleet.push(car("A", 30.0));
        let mut trips = TripManager::default();
        let vehicle = fleet.get_mut(VehicleId(0)).unwrap();
        trips
            .start(
                &graph,
                vehicle,
                crate::trip::TripPurpose::Reposition,
                vec!["A".into(), "E".into(), "F".into()],
                0,
                0,
            )
            .unwrap();
        let policy = RechargePolicy::DuringTrip {
            critical_pct: DEFAULT_CRITICAL_PCT,
            safety_margin_km: DEFAULT_SAFETY_MARGIN_KM,
        };
        // 24 km left + 10 km margin > 30 km autonomy.
        let vehicle = fleet.get(VehicleId(0)).unwrap();
        assert!(policy.should_schedule(vehicle, &trips));
        assert!(!RechargePolicy::default().should_schedule(vehicle, &trips));
    }

    #[test]
    fn en_route_plan_detours_through_a_station() {
        let graph = town();
        let router = router();
        let mut fleet = crate::fleet::Fleet::default();
        fleet.push(car("E", 12.0));
        let mut trips = TripManager::default();
        let trip = trips
            .start(
                &graph,
                fleet.get_mut(VehicleId(0)).unwrap(),
                crate::trip::TripPurpose::Reposition,
                vec!["E".into(), "A".into(), "B".into()],
                0,
                0,
            )
            .unwrap();
        let vehicle = fleet.get(VehicleId(0)).unwrap();
        let trip = trips.get(trip).unwrap();

        let found = RechargePolicy::default()
            .plan_en_route(vehicle, &graph, router.as_ref(), trip)
            .unwrap();
        assert_eq!(found.plan.station, "F");
        assert_eq!(found.plan.route, vec!["E", "A", "B", "F"]);
        assert_eq!(found.plan.distance_km, 9.0);
        assert_eq!(found.route_to_client, vec!["F", "B"]);

        let empty = vehicle.clone().with_autonomy(5.0);
        assert!(RechargePolicy::default()
            .plan_en_route(&empty, &graph, router.as_ref(), trip)
            .is_none());
        assert!(RechargePolicy::Disabled
            .plan_en_route(vehicle, &graph, router.as_ref(), trip)
            .is_none());
    }
}
