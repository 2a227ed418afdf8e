//! Trip ledger and the single writer of the active-trips index.
//!
//! Every trip ever started lives in an append-only arena addressed by [TripId]. The
//! per-vehicle index of active trips is private: it is only changed by
//! [TripManager::start], [TripManager::start_shared] and [TripManager::conclude]. Other
//! systems read it through the accessors below.

use std::collections::BTreeMap;

use bevy_ecs::prelude::Resource;

use crate::clock::ms_to_hours;
use crate::fleet::{Fleet, Vehicle, VehicleId, VehicleState};
use crate::graph::{CityGraph, Route};
use crate::trip::{Advance, RerouteDelta, Trip, TripId, TripPurpose};

/// Why a trip could not be started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    EmptyRoute,
    /// Route does not begin where the vehicle is.
    WrongOrigin,
    Capacity,
}

/// Progress reported by [TripManager::advance_all] for one trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripProgress {
    pub trip: TripId,
    pub vehicle: VehicleId,
    pub advance: Advance,
}

#[derive(Debug, Default, Resource)]
pub struct TripManager {
    trips: Vec<Trip>,
    active: BTreeMap<VehicleId, Vec<TripId>>,
    last_progress_at: u64,
}

impl TripManager {
    pub fn get(&self, id: TripId) -> Option<&Trip> {
        self.trips.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Trip> {
        self.trips.iter()
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }

    /// Active trip ids of `vehicle`, oldest first.
    pub fn active_for(&self, vehicle: VehicleId) -> &[TripId] {
        self.active.get(&vehicle).map_or(&[], Vec::as_slice)
    }

    pub fn active_trips(&self, vehicle: VehicleId) -> impl Iterator<Item = &Trip> + '_ {
        self.active_for(vehicle)
            .iter()
            .filter_map(move |id| self.get(*id))
    }

    pub fn has_active(&self, vehicle: VehicleId) -> bool {
        !self.active_for(vehicle).is_empty()
    }

    /// Most recently started active trip of `vehicle`.
    pub fn latest_active(&self, vehicle: VehicleId) -> Option<&Trip> {
        self.active_for(vehicle).last().and_then(|id| self.get(*id))
    }

    /// Every active trip, grouped by vehicle id then start order.
    pub fn iter_active(&self) -> impl Iterator<Item = &Trip> + '_ {
        self.active
            .values()
            .flatten()
            .filter_map(move |id| self.get(*id))
    }

    pub fn active_count(&self) -> usize {
        self.active.values().map(Vec::len).sum()
    }

    /// Time up to which trips have been advanced.
    pub fn last_progress_at(&self) -> u64 {
        self.last_progress_at
    }

    /// Starts a trip for a vehicle that is stationary at `route[0]`.
    ///
    /// Passenger trips board their passengers immediately; a trip that would exceed the
    /// vehicle capacity is refused and nothing changes.
    pub fn start(
        &mut self,
        graph: &CityGraph,
        vehicle: &mut Vehicle,
        purpose: TripPurpose,
        route: Route,
        pickup_index: usize,
        now: u64,
    ) -> Result<TripId, StartError> {
        let Some(first) = route.first() else {
            return Err(StartError::EmptyRoute);
        };
        if *first != vehicle.location {
            return Err(StartError::WrongOrigin);
        }
        self.insert(graph, vehicle, purpose, route, pickup_index, 0.0, now)
    }

    /// Starts a passenger trip that rides along `host`, sharing its position.
    ///
    /// `route` must begin at the host's current node; the new trip inherits the distance
    /// already covered on the host's current segment.
    pub fn start_shared(
        &mut self,
        graph: &CityGraph,
        vehicle: &mut Vehicle,
        host: TripId,
        purpose: TripPurpose,
        route: Route,
        pickup_index: usize,
        now: u64,
    ) -> Result<TripId, StartError> {
        let Some(host_trip) = self.get(host) else {
            return Err(StartError::WrongOrigin);
        };
        if route.first().map(String::as_str) != Some(host_trip.current_node()) {
            return Err(StartError::WrongOrigin);
        }
        let offset = host_trip.distance_in_segment;
        self.insert(graph, vehicle, purpose, route, pickup_index, offset, now)
    }

    #[allow(clippy::too_many_arguments)]
    fn insert(
        &mut self,
        graph: &CityGraph,
        vehicle: &mut Vehicle,
        purpose: TripPurpose,
        route: Route,
        pickup_index: usize,
        offset_km: f64,
        now: u64,
    ) -> Result<TripId, StartError> {
        if let TripPurpose::Passenger { passengers, .. } = purpose {
            if !vehicle.board(passengers) {
                return Err(StartError::Capacity);
            }
        }

        let id = TripId(self.trips.len() as u32);
        let mut trip = Trip::new(graph, id, vehicle.id, purpose, route, pickup_index, now);
        if offset_km > 0.0 && trip.is_active() {
            let limit = trip.segments[0].distance_km;
            trip.distance_in_segment = offset_km.min(limit);
            trip.distance_traveled = trip.distance_in_segment;
        }
        self.trips.push(trip);
        self.active.entry(vehicle.id).or_default().push(id);
        vehicle.state = VehicleState::EnRoute;
        Ok(id)
    }

    /// Advances every active trip to `now` and returns per-trip progress.
    ///
    /// Vehicle autonomy is consumed once per vehicle: shared trips move together, so the
    /// largest distance among a vehicle's trips is what the vehicle drove.
    pub fn advance_all(&mut self, now: u64, vehicles: &mut Fleet) -> Vec<TripProgress> {
        let elapsed_ms = now.saturating_sub(self.last_progress_at);
        self.last_progress_at = self.last_progress_at.max(now);
        if elapsed_ms == 0 {
            return Vec::new();
        }
        let hours = ms_to_hours(elapsed_ms);

        let mut progress = Vec::new();
        for (vehicle_id, ids) in &self.active {
            let mut driven: f64 = 0.0;
            let mut position: Option<String> = None;
            for id in ids {
                let Some(trip) = self.trips.get_mut(id.0 as usize) else {
                    continue;
                };
                let advance = trip.advance(hours);
                if advance.distance_km > driven || position.is_none() {
                    position = Some(trip.current_node().to_string());
                }
                driven = driven.max(advance.distance_km);
                progress.push(TripProgress {
                    trip: *id,
                    vehicle: *vehicle_id,
                    advance,
                });
            }
            if let Some(vehicle) = vehicles.get_mut(*vehicle_id) {
                vehicle.consume(driven);
                if let Some(position) = position {
                    vehicle.location = position;
                }
            }
        }
        progress
    }

    /// Detaches a finished trip from its vehicle.
    ///
    /// Returns `None` when the trip is unknown, still running, or already detached.
    /// The vehicle drops the trip's passengers, moves to the trip's destination, and goes
    /// back to Available once it has no active trips left.
    pub fn conclude(&mut self, id: TripId, vehicle: &mut Vehicle) -> Option<&Trip> {
        let trip = self.trips.get(id.0 as usize)?;
        if trip.is_active() || trip.vehicle != vehicle.id {
            return None;
        }
        let ids = self.active.get_mut(&vehicle.id)?;
        let position = ids.iter().position(|active| *active == id)?;
        ids.remove(position);
        if ids.is_empty() {
            self.active.remove(&vehicle.id);
        }

        vehicle.alight(trip.passengers());
        if let Some(destination) = trip.destination() {
            vehicle.location = destination.to_string();
        }
        if !self.active.contains_key(&vehicle.id) && vehicle.state == VehicleState::EnRoute {
            vehicle.state = VehicleState::Available;
        }
        Some(trip)
    }

    /// Marks the pickup of a trip as reported. Returns `true` only the first time, and
    /// only once the client has actually been reached.
    pub fn report_pickup(&mut self, id: TripId) -> bool {
        let Some(trip) = self.trips.get_mut(id.0 as usize) else {
            return false;
        };
        if !trip.picked_up || trip.pickup_reported {
            return false;
        }
        trip.pickup_reported = true;
        true
    }

    /// Replaces the remaining route of an active trip. See [Trip::apply_route].
    pub fn reroute(
        &mut self,
        id: TripId,
        graph: &CityGraph,
        tail: &[String],
    ) -> Option<RerouteDelta> {
        let trip = self.trips.get_mut(id.0 as usize)?;
        if !trip.is_active() {
            return None;
        }
        trip.apply_route(graph, tail)
    }

    /// Reroutes an active trip through a refuel stop. See [Trip::splice_stop].
    pub fn splice_stop(
        &mut self,
        id: TripId,
        graph: &CityGraph,
        tail: &[String],
        stop_offset: usize,
        hours: f64,
    ) -> Option<RerouteDelta> {
        let trip = self.trips.get_mut(id.0 as usize)?;
        if !trip.is_active() {
            return None;
        }
        trip.splice_stop(graph, tail, stop_offset, hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ONE_HOUR_MS;
    use crate::fleet::Propulsion;
    use crate::graph::{EdgeSpec, NodeSpec};
    use crate::requests::RequestId;

    fn line() -> CityGraph {
        let mut graph = CityGraph::new(false);
        for name in ["A", "B", "C"] {
            graph.add_node(NodeSpec::new(name)).unwrap();
        }
        graph.add_edge("A", "B", EdgeSpec::new("AB", 10.0, 10.0)).unwrap();
        graph.add_edge("B", "C", EdgeSpec::new("BC", 10.0, 10.0)).unwrap();
        graph
    }

    fn route(names: &[&str]) -> Route {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn fleet() -> Fleet {
        let mut fleet = Fleet::default();
        fleet.push(Vehicle::new(VehicleId(0), "V1", Propulsion::Combustion, 100.0, 2, 0.5, "A"));
        fleet
    }

    fn ride(request: u64, passengers: u32) -> TripPurpose {
        TripPurpose::Passenger {
            request: RequestId(request),
            passengers,
        }
    }

    #[test]
    fn start_and_conclude_keep_capacity_and_state() {
        let graph = line();
        let mut fleet = fleet();
        let mut manager = TripManager::default();
        let vehicle = fleet.get_mut(VehicleId(0)).unwrap();

        assert_eq!(
            manager.start(&graph, vehicle, ride(1, 3), route(&["A", "B"]), 0, 0),
            Err(StartError::Capacity)
        );
        assert_eq!(
            manager.start(&graph, vehicle, ride(1, 1), route(&["B", "C"]), 0, 0),
            Err(StartError::WrongOrigin)
        );
        let id = manager
            .start(&graph, vehicle, ride(1, 2), route(&["A", "B", "C"]), 0, 0)
            .unwrap();
        assert_eq!(vehicle.state, VehicleState::EnRoute);
        assert_eq!(vehicle.passengers, 2);
        assert!(manager.conclude(id, vehicle).is_none(), "still running");

        let progress = manager.advance_all(2 * ONE_HOUR_MS, &mut fleet);
        assert!(progress[0].advance.concluded);
        let vehicle = fleet.get_mut(VehicleId(0)).unwrap();
        assert_eq!(vehicle.autonomy_km, 80.0);

        assert!(manager.conclude(id, vehicle).is_some());
        assert!(manager.conclude(id, vehicle).is_none(), "detached once");
        assert_eq!(vehicle.passengers, 0);
        assert_eq!(vehicle.location, "C");
        assert_eq!(vehicle.state, VehicleState::Available);
        assert!(!manager.has_active(VehicleId(0)));
    }

    #[test]
    fn shared_trips_consume_autonomy_once() {
        let graph = line();
        let mut fleet = fleet();
        let mut manager = TripManager::default();
        let host = {
            let vehicle = fleet.get_mut(VehicleId(0)).unwrap();
            manager
                .start(&graph, vehicle, ride(1, 1), route(&["A", "B", "C"]), 0, 0)
                .unwrap()
        };
        manager.advance_all(ONE_HOUR_MS / 2, &mut fleet);

        let vehicle = fleet.get_mut(VehicleId(0)).unwrap();
        let guest = manager
            .start_shared(
                &graph,
                vehicle,
                host,
                ride(2, 1),
                route(&["A", "B", "C"]),
                1,
                ONE_HOUR_MS / 2,
            )
            .unwrap();
        assert_eq!(manager.active_for(VehicleId(0)), &[host, guest]);
        assert_eq!(manager.get(guest).unwrap().distance_traveled, 5.0);

        manager.advance_all(ONE_HOUR_MS, &mut fleet);
        assert_eq!(fleet.get(VehicleId(0)).unwrap().autonomy_km, 90.0);
        assert_eq!(fleet.get(VehicleId(0)).unwrap().location, "B");
        assert!(manager.get(guest).unwrap().picked_up);
    }
}
