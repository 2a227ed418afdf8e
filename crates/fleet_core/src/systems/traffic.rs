//! Timed traffic changes and the reroute of trips they affect.

use bevy_ecs::prelude::{Res, ResMut, Resource};

use crate::clock::{
    CurrentEvent, EventKind, EventSubject, SimulationClock, RECHARGE_PRIORITY,
};
use crate::fleet::{Fleet, VehicleId};
use crate::graph::{CityGraph, Route, TrafficLevel};
use crate::lifecycle::TripManager;
use crate::metrics::{FleetMetrics, RecalculationRecord};
use crate::policies::RechargePolicy;
use crate::routing::{RouteStrategy, Router};
use crate::systems::schedule_trip_events;
use crate::trip::{Trip, TripId};

/// One scheduled change of an edge's traffic level.
#[derive(Debug, Clone, PartialEq)]
pub struct TrafficChange {
    pub at: u64,
    /// Edge name; applies to both directions of an undirected street.
    pub edge: String,
    pub level: TrafficLevel,
    pub description: String,
}

/// All traffic changes of a run. `TrafficChange` events carry an index into it.
#[derive(Debug, Clone, Default, Resource)]
pub struct TrafficTimeline {
    changes: Vec<TrafficChange>,
}

impl TrafficTimeline {
    pub fn push(&mut self, change: TrafficChange) {
        self.changes.push(change);
    }

    pub fn get(&self, index: usize) -> Option<&TrafficChange> {
        self.changes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrafficChange> {
        self.changes.iter()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl FromIterator<TrafficChange> for TrafficTimeline {
    fn from_iter<T: IntoIterator<Item = TrafficChange>>(iter: T) -> Self {
        Self {
            changes: iter.into_iter().collect(),
        }
    }
}

/// Joins `waypoints` into one route starting at `anchor`, leg by leg. A waypoint that
/// cannot be reached is skipped and the next leg starts from the last one reached.
fn route_through(
    graph: &CityGraph,
    router: &dyn RouteStrategy,
    anchor: &str,
    waypoints: &[String],
) -> Route {
    let mut route = vec![anchor.to_string()];
    let mut at = anchor.to_string();
    for waypoint in waypoints {
        if at == *waypoint {
            continue;
        }
        match router.route(graph, &at, waypoint, None) {
            Some(leg) if leg.len() >= 2 => {
                route.extend(leg.into_iter().skip(1));
                at = waypoint.clone();
            }
            _ => log::debug!("no leg from {} to {}, skipping it", at, waypoint),
        }
    }
    route
}

/// The part of `combined` a single trip rides: up to its destination, and past its
/// client first while the client is still waiting.
fn tail_for(trip: &Trip, combined: &[String]) -> Option<Route> {
    let mut from = 0;
    if !trip.picked_up {
        let client = trip.client_node()?;
        from = combined.iter().position(|node| node == client)?;
    }
    let destination = trip.destination()?;
    let end = from + combined[from..].iter().position(|node| node == destination)?;
    if end == 0 {
        return None;
    }
    Some(combined[..=end].to_vec())
}

/// Plans new remaining routes for the active trips of `vehicle`.
///
/// Shared trips move together, so one route is built through the pending waypoints of
/// every trip, oldest trip first, and each trip takes its prefix. Trips whose waypoints
/// did not make it into that route keep their current one.
fn replan_vehicle(
    graph: &CityGraph,
    router: &dyn RouteStrategy,
    trips: &TripManager,
    vehicle: VehicleId,
) -> Vec<(TripId, Route)> {
    let active: Vec<&Trip> = trips.active_trips(vehicle).collect();
    let Some(first) = active.first() else {
        return Vec::new();
    };
    let anchor = first.anchor_node().to_string();

    let mut waypoints: Vec<String> = Vec::new();
    for trip in &active {
        for node in trip.pending_waypoints() {
            if !waypoints.contains(&node) {
                waypoints.push(node);
            }
        }
    }

    let combined = route_through(graph, router, &anchor, &waypoints);
    if combined.len() < 2 {
        return Vec::new();
    }
    active
        .iter()
        .filter_map(|trip| tail_for(trip, &combined).map(|tail| (trip.id, tail)))
        .collect()
}

/// Applies a traffic change and reroutes the trips whose remaining route uses the edge.
///
/// A vehicle whose new routes are longer than its autonomy gets a `NeedRecharge`.
#[allow(clippy::too_many_arguments)]
pub fn traffic_change_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    timeline: Res<TrafficTimeline>,
    mut graph: ResMut<CityGraph>,
    router: Res<Router>,
    fleet: Res<Fleet>,
    mut trips: ResMut<TripManager>,
    mut metrics: ResMut<FleetMetrics>,
    recharge: Res<RechargePolicy>,
) {
    let Some(EventSubject::Traffic(index)) = event.0.subject else {
        return;
    };
    let Some(change) = timeline.get(index) else {
        return;
    };
    let now = clock.now();
    if !graph.set_traffic_level(&change.edge, change.level) {
        log::warn!("traffic change for unknown edge '{}'", change.edge);
        return;
    }
    log::info!("traffic on {} is now {:?} {}", change.edge, change.level, change.description);

    let mut vehicles: Vec<VehicleId> = trips
        .iter_active()
        .filter(|trip| trip.uses_edge_ahead(&graph, &change.edge))
        .map(|trip| trip.vehicle)
        .collect();
    vehicles.dedup();

    for vehicle in vehicles {
        let label = fleet.get(vehicle).map_or("?", |v| v.label.as_str());
        let on_edge = trips.active_trips(vehicle).any(|trip| {
            trip.distance_in_segment > 0.0
                && trip.segments.get(trip.segment_index).is_some_and(|segment| {
                    graph
                        .edge(&segment.from, &segment.to)
                        .is_some_and(|edge| edge.name == change.edge)
                })
        });
        let plan = replan_vehicle(&graph, &**router, &trips, vehicle);
        if plan.is_empty() {
            if on_edge {
                log::warn!(
                    "vehicle {} is on {} and cannot be rerouted, keeping its route",
                    label,
                    change.edge
                );
            } else {
                log::warn!("no alternative route for vehicle {} around {}", label, change.edge);
            }
            continue;
        }

        for (trip_id, tail) in plan {
            let Some(delta) = trips.reroute(trip_id, &graph, &tail) else {
                log::warn!("trip {} of vehicle {} rejected its new route", trip_id.0, label);
                continue;
            };
            log::debug!(
                "trip {} rerouted ({:+.1} min, {:+.2} km)",
                trip_id.0,
                delta.minutes_delta(),
                delta.new_distance_km - delta.old_distance_km
            );
            metrics.record_recalculation(RecalculationRecord {
                at: now,
                trip: trip_id,
                vehicle,
                edge: change.edge.clone(),
                minutes_delta: delta.minutes_delta(),
                distance_delta_km: delta.new_distance_km - delta.old_distance_km,
            });
            if let Some(trip) = trips.get(trip_id) {
                schedule_trip_events(&mut clock, trip);
            }
        }

        let Some(vehicle) = fleet.get(vehicle) else {
            continue;
        };
        let needed_km = trips
            .active_trips(vehicle.id)
            .map(Trip::remaining_distance)
            .fold(0.0, f64::max);
        if vehicle.autonomy_km < needed_km
            && recharge.allows_recharge()
            && vehicle.pending_plan.is_none()
        {
            log::warn!(
                "vehicle {} needs {:.1} km after the reroute but has {:.1} km",
                label,
                needed_km,
                vehicle.autonomy_km
            );
            clock.schedule_with_priority(
                now,
                EventKind::NeedRecharge,
                RECHARGE_PRIORITY,
                Some(EventSubject::Vehicle(vehicle.id)),
            );
        }
    }
}
