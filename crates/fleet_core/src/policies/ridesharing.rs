//! Ride-sharing: letting a request board a vehicle that is already carrying others.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::fleet::VehicleId;
use crate::graph::{CityGraph, Route};
use crate::lifecycle::TripManager;
use crate::routing::RouteStrategy;
use crate::trip::{Trip, TripId, TripPurpose};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Resource)]
#[serde(rename_all = "snake_case")]
pub enum RideSharingPolicy {
    #[default]
    Disabled,
    /// No detours: the request origin must lie ahead on the vehicle's current route.
    Simple,
}

/// Route for a request joining a moving vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedRoute {
    /// Trip whose position the new trip inherits.
    pub host: TripId,
    /// From the host's current node, through the origin, to the request destination.
    pub route: Route,
    pub pickup_index: usize,
    pub distance_to_client: f64,
    pub request_distance: f64,
}

/// The passenger trip whose remaining route covers the others: the longest one.
pub fn host_trip(trips: &TripManager, vehicle: VehicleId) -> Option<&Trip> {
    trips
        .active_trips(vehicle)
        .filter(|trip| matches!(trip.purpose, TripPurpose::Passenger { .. }))
        .fold(None, |best: Option<&Trip>, trip| match best {
            Some(current) if current.remaining_route().len() >= trip.remaining_route().len() => {
                Some(current)
            }
            _ => Some(trip),
        })
}

/// Position of `node` in `trip`'s remaining route at or after the anchor, relative to
/// the current node.
fn ahead_position(trip: &Trip, node: &str) -> Option<usize> {
    let skip = trip.anchor_index().saturating_sub(trip.segment_index);
    trip.remaining_route()
        .iter()
        .enumerate()
        .skip(skip)
        .find(|(_, name)| name.as_str() == node)
        .map(|(index, _)| index)
}

impl RideSharingPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            RideSharingPolicy::Disabled => "disabled",
            RideSharingPolicy::Simple => "simple",
        }
    }

    pub fn allows(&self) -> bool {
        matches!(self, RideSharingPolicy::Simple)
    }

    /// Whether `origin` is still ahead of `vehicle` on its current route.
    pub fn passes_through(&self, trips: &TripManager, vehicle: VehicleId, origin: &str) -> bool {
        self.allows()
            && host_trip(trips, vehicle).is_some_and(|trip| ahead_position(trip, origin).is_some())
    }

    /// Builds the route for a request sharing `vehicle`.
    ///
    /// The new trip follows the vehicle's current route up to the origin and from there
    /// to the destination, extending the route with a fresh search when the destination
    /// is not already ahead.
    pub fn adjust_routes(
        &self,
        trips: &TripManager,
        vehicle: VehicleId,
        origin: &str,
        destination: &str,
        graph: &CityGraph,
        router: &dyn RouteStrategy,
    ) -> Option<SharedRoute> {
        if !self.allows() {
            return None;
        }
        let host = host_trip(trips, vehicle)?;
        let plan = host.remaining_route();
        let pickup_index = ahead_position(host, origin)?;

        let tail = &plan[pickup_index..];
        let route: Route = match tail.iter().skip(1).position(|node| node == destination) {
            Some(offset) => plan[..=pickup_index + 1 + offset].to_vec(),
            None => {
                let end = plan.last()?;
                let extension = router.route(graph, end, destination, None)?;
                if extension.len() < 2 && end != destination {
                    return None;
                }
                let mut route = plan.to_vec();
                route.extend(extension.into_iter().skip(1));
                route
            }
        };

        let distance_to_client =
            (graph.route_distance(&route[..=pickup_index]) - host.distance_in_segment).max(0.0);
        let request_distance = graph.route_distance(&route[pickup_index..]);

        Some(SharedRoute {
            host: host.id,
            route,
            pickup_index,
            distance_to_client,
            request_distance,
        })
    }
}
