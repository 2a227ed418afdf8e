//! Trip execution record: segment-level progress along a route.
//!
//! Progress is time driven. Each call to [Trip::advance] consumes elapsed simulated
//! hours segment by segment: a segment is either finished (remainder carries over) or
//! partially advanced (remainder becomes zero). Zero or negative elapsed time is a no-op.

use serde::{Deserialize, Serialize};

use crate::fleet::VehicleId;
use crate::graph::{CityGraph, Route};
use crate::requests::RequestId;

/// Assumed segment when two consecutive route nodes have no edge.
const FALLBACK_SEGMENT_KM: f64 = 10.0;
const FALLBACK_SPEED_KMH: f64 = 50.0;

/// Tolerance (hours) when comparing elapsed time against segment time.
const TIME_EPSILON_HOURS: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TripId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum TripPurpose {
    Passenger { request: RequestId, passengers: u32 },
    ToStation { station: String },
    Reposition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripState {
    Active,
    Concluded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub from: String,
    pub to: String,
    pub distance_km: f64,
    pub speed_kmh: f64,
    pub hours: f64,
}

fn build_segments(graph: &CityGraph, route: &[String]) -> Vec<Segment> {
    route
        .windows(2)
        .map(|pair| match graph.edge(&pair[0], &pair[1]) {
            Some(edge) => Segment {
                from: pair[0].clone(),
                to: pair[1].clone(),
                distance_km: edge.distance_km,
                speed_kmh: edge.speed_kmh,
                hours: edge.travel_time_hours(),
            },
            None => {
                log::warn!(
                    "segment {} -> {} has no edge, assuming {} km",
                    pair[0],
                    pair[1],
                    FALLBACK_SEGMENT_KM
                );
                Segment {
                    from: pair[0].clone(),
                    to: pair[1].clone(),
                    distance_km: FALLBACK_SEGMENT_KM,
                    speed_kmh: FALLBACK_SPEED_KMH,
                    hours: FALLBACK_SEGMENT_KM / FALLBACK_SPEED_KMH,
                }
            }
        })
        .collect()
}

/// Refuel stop spliced into a route: the vehicle waits `hours` at `route[index]`
/// before driving on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stop {
    pub index: usize,
    pub hours: f64,
    pub waited: f64,
}

impl Stop {
    pub fn remaining_hours(&self) -> f64 {
        (self.hours - self.waited).max(0.0)
    }

    pub fn is_done(&self) -> bool {
        self.waited + TIME_EPSILON_HOURS >= self.hours
    }
}

/// Outcome of one [Trip::advance] call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Advance {
    pub distance_km: f64,
    pub reached_pickup: bool,
    pub concluded: bool,
}

/// Remaining-route comparison produced by a reroute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerouteDelta {
    pub old_hours: f64,
    pub new_hours: f64,
    pub old_distance_km: f64,
    pub new_distance_km: f64,
}

impl RerouteDelta {
    pub fn minutes_delta(&self) -> f64 {
        (self.new_hours - self.old_hours) * 60.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub id: TripId,
    pub vehicle: VehicleId,
    pub purpose: TripPurpose,
    pub route: Route,
    pub segments: Vec<Segment>,
    /// Index in `route` where the client joins. Meaningful for passenger trips only.
    pub pickup_index: usize,
    pub picked_up: bool,
    /// Set once the pickup has been announced to the rest of the simulation.
    pub pickup_reported: bool,
    pub segment_index: usize,
    pub distance_in_segment: f64,
    pub distance_traveled: f64,
    pub total_distance: f64,
    pub started_at: u64,
    pub state: TripState,
    pub stop: Option<Stop>,
}

impl Trip {
    pub fn new(
        graph: &CityGraph,
        id: TripId,
        vehicle: VehicleId,
        purpose: TripPurpose,
        route: Route,
        pickup_index: usize,
        started_at: u64,
    ) -> Self {
        let segments = build_segments(graph, &route);
        let total_distance = segments.iter().map(|s| s.distance_km).sum();
        let concluded = segments.is_empty();
        Self {
            id,
            vehicle,
            purpose,
            route,
            segments,
            pickup_index,
            picked_up: pickup_index == 0,
            pickup_reported: false,
            segment_index: 0,
            distance_in_segment: 0.0,
            distance_traveled: 0.0,
            total_distance,
            started_at,
            state: if concluded {
                TripState::Concluded
            } else {
                TripState::Active
            },
            stop: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == TripState::Active
    }

    pub fn request(&self) -> Option<RequestId> {
        match self.purpose {
            TripPurpose::Passenger { request, .. } => Some(request),
            _ => None,
        }
    }

    pub fn passengers(&self) -> u32 {
        match self.purpose {
            TripPurpose::Passenger { passengers, .. } => passengers,
            _ => 0,
        }
    }

    pub fn destination(&self) -> Option<&str> {
        self.route.last().map(String::as_str)
    }

    pub fn client_node(&self) -> Option<&str> {
        match self.purpose {
            TripPurpose::Passenger { .. } => self.route.get(self.pickup_index).map(String::as_str),
            _ => None,
        }
    }

    /// Last node the vehicle passed.
    pub fn current_node(&self) -> &str {
        let index = self.segment_index.min(self.route.len().saturating_sub(1));
        &self.route[index]
    }

    /// First node the route can be changed from: the current node, or the end of the
    /// current segment when the vehicle is partway along it.
    pub fn anchor_index(&self) -> usize {
        let last = self.route.len().saturating_sub(1);
        if self.distance_in_segment > 0.0 {
            (self.segment_index + 1).min(last)
        } else {
            self.segment_index.min(last)
        }
    }

    pub fn anchor_node(&self) -> &str {
        &self.route[self.anchor_index()]
    }

    /// Route from the current segment onward.
    pub fn remaining_route(&self) -> &[String] {
        let index = self.segment_index.min(self.route.len());
        &self.route[index..]
    }

    pub fn remaining_distance(&self) -> f64 {
        (self.total_distance - self.distance_traveled).max(0.0)
    }

    pub fn remaining_hours(&self) -> f64 {
        self.hours_until(self.segments.len())
    }

    /// Refuel stop the vehicle has not started waiting at yet.
    pub fn stop_ahead(&self) -> Option<&Stop> {
        self.stop
            .as_ref()
            .filter(|stop| stop.waited <= 0.0 && stop.index >= self.segment_index)
    }

    /// Whether the vehicle stands on its refuel stop and still has to wait there.
    pub fn at_stop(&self) -> bool {
        self.stop.as_ref().is_some_and(|stop| {
            stop.index == self.segment_index && self.distance_in_segment == 0.0 && !stop.is_done()
        })
    }

    /// Hours left until the vehicle reaches `route[node_index]`, refuel stop included.
    pub fn hours_until(&self, node_index: usize) -> f64 {
        let waiting = self
            .stop
            .as_ref()
            .filter(|stop| stop.index >= self.segment_index && stop.index < node_index)
            .map_or(0.0, Stop::remaining_hours);
        waiting
            + self
                .segments
                .iter()
                .enumerate()
                .take(node_index)
                .skip(self.segment_index)
                .map(|(index, segment)| {
                    if index == self.segment_index && segment.distance_km > 0.0 {
                        (segment.distance_km - self.distance_in_segment) / segment.distance_km
                            * segment.hours
                    } else {
                        segment.hours
                    }
                })
                .sum::<f64>()
    }

    pub fn progress_pct(&self) -> f64 {
        if self.total_distance <= 0.0 {
            return if self.is_active() { 0.0 } else { 100.0 };
        }
        (self.distance_traveled / self.total_distance * 100.0).min(100.0)
    }

    /// Whether the remaining route traverses an edge called `edge_name`.
    pub fn uses_edge_ahead(&self, graph: &CityGraph, edge_name: &str) -> bool {
        self.remaining_route().windows(2).any(|pair| {
            graph
                .edge(&pair[0], &pair[1])
                .is_some_and(|edge| edge.name == edge_name)
        })
    }

    /// Nodes the trip still has to visit, in route order: a waiting client, a refuel
    /// stop not reached yet, then the destination.
    pub fn pending_waypoints(&self) -> Vec<String> {
        let anchor = self.anchor_index();
        let mut points: Vec<(usize, &str)> = Vec::with_capacity(3);
        if !self.picked_up {
            if let Some(client) = self.client_node() {
                points.push((self.pickup_index, client));
            }
        }
        if let Some(stop) = self.stop.filter(|stop| stop.index >= anchor && !stop.is_done()) {
            points.push((stop.index, self.route[stop.index].as_str()));
        }
        if let Some(destination) = self.destination() {
            points.push((self.route.len().saturating_sub(1), destination));
        }
        points.sort_by_key(|(index, _)| *index);
        points.dedup_by(|a, b| a.1 == b.1);
        points.into_iter().map(|(_, node)| node.to_string()).collect()
    }

    /// Consumes `elapsed_hours` of driving.
    pub fn advance(&mut self, elapsed_hours: f64) -> Advance {
        let mut outcome = Advance::default();
        if !self.is_active() || !(elapsed_hours > 0.0) {
            return outcome;
        }

        let mut remaining = elapsed_hours;
        while remaining > 0.0 && self.segment_index < self.segments.len() {
            if self.at_stop() {
                if let Some(stop) = self.stop.as_mut() {
                    let left = stop.remaining_hours();
                    if remaining + TIME_EPSILON_HOURS >= left {
                        stop.waited = stop.hours;
                        remaining -= left;
                    } else {
                        stop.waited += remaining;
                        remaining = 0.0;
                    }
                }
                continue;
            }
            let segment = &self.segments[self.segment_index];
            let left_km = segment.distance_km - self.distance_in_segment;
            let to_finish = if segment.distance_km > 0.0 {
                left_km / segment.distance_km * segment.hours
            } else {
                0.0
            };

            if remaining + TIME_EPSILON_HOURS >= to_finish {
                self.distance_traveled += left_km;
                outcome.distance_km += left_km;
                self.distance_in_segment = 0.0;
                self.segment_index += 1;
                remaining -= to_finish;
            } else {
                let speed = if segment.hours > 0.0 {
                    segment.distance_km / segment.hours
                } else {
                    0.0
                };
                let advanced = (speed * remaining).min(left_km);
                self.distance_in_segment += advanced;
                self.distance_traveled += advanced;
                outcome.distance_km += advanced;
                remaining = 0.0;
            }
        }

        if !self.picked_up && self.segment_index >= self.pickup_index {
            self.picked_up = true;
            outcome.reached_pickup = true;
        }
        if self.segment_index >= self.segments.len() {
            self.state = TripState::Concluded;
            self.distance_in_segment = 0.0;
            self.distance_traveled = self.total_distance;
            outcome.concluded = true;
        }
        outcome
    }

    /// Replaces the route from the anchor node onward with `tail`.
    ///
    /// `tail` must start at [Trip::anchor_node] and, while the client has not been
    /// picked up, pass through the client node. A refuel stop still ahead must stay on
    /// the new route. Returns `None` and leaves the trip untouched otherwise.
    pub fn apply_route(&mut self, graph: &CityGraph, tail: &[String]) -> Option<RerouteDelta> {
        let anchor = self.anchor_index();
        if tail.first().map(String::as_str) != Some(self.anchor_node()) {
            return None;
        }

        let mut route: Route = self.route[..anchor].to_vec();
        route.extend_from_slice(tail);

        let pickup_index = if self.picked_up {
            self.pickup_index
        } else {
            let client = self.client_node()?.to_string();
            anchor + tail.iter().position(|node| *node == client)?
        };
        let stop = match self.stop {
            Some(stop) if stop.index >= anchor => {
                let station = &self.route[stop.index];
                Some(Stop {
                    index: anchor + tail.iter().position(|node| node == station)?,
                    ..stop
                })
            }
            other => other,
        };

        let old_hours = self.remaining_hours();
        let old_distance_km = self.remaining_distance();

        let mut segments = self.segments[..anchor.min(self.segments.len())].to_vec();
        segments.extend(build_segments(graph, tail));

        self.total_distance = segments.iter().map(|s| s.distance_km).sum();
        self.segments = segments;
        self.route = route;
        self.pickup_index = pickup_index;
        self.stop = stop;

        Some(RerouteDelta {
            old_hours,
            new_hours: self.remaining_hours(),
            old_distance_km,
            new_distance_km: self.remaining_distance(),
        })
    }

    /// Reroutes through a refuel stop at `tail[stop_offset]`, waiting `hours` there.
    ///
    /// Refused while another stop is still ahead, or when `stop_offset` is the last node.
    pub fn splice_stop(
        &mut self,
        graph: &CityGraph,
        tail: &[String],
        stop_offset: usize,
        hours: f64,
    ) -> Option<RerouteDelta> {
        if self.stop.is_some_and(|stop| !stop.is_done()) || stop_offset + 1 >= tail.len() {
            return None;
        }
        let anchor = self.anchor_index();
        let mut delta = self.apply_route(graph, tail)?;
        self.stop = Some(Stop {
            index: anchor + stop_offset,
            hours,
            waited: 0.0,
        });
        delta.new_hours = self.remaining_hours();
        Some(delta)
    }
}
