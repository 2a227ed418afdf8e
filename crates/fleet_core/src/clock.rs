//! Discrete-event clock.
//!
//! Events are ordered by `(timestamp, -priority, insertion sequence)`: earlier first,
//! then higher priority, then first scheduled. Time is in simulation milliseconds.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::Resource;

use crate::fleet::VehicleId;
use crate::requests::RequestId;
use crate::trip::TripId;

pub const ONE_SEC_MS: u64 = 1_000;
pub const ONE_MIN_MS: u64 = 60 * ONE_SEC_MS;
pub const ONE_HOUR_MS: u64 = 60 * ONE_MIN_MS;

/// Priority used for recharge start/end so they run before same-instant arrivals.
pub const RECHARGE_PRIORITY: i32 = 5;

/// Converts simulated hours to whole milliseconds, rounding up so an event scheduled
/// for the end of a movement never fires before the movement completes.
pub fn hours_to_ms(hours: f64) -> u64 {
    if !hours.is_finite() || hours <= 0.0 {
        return 0;
    }
    (hours * ONE_HOUR_MS as f64).ceil() as u64
}

pub fn ms_to_hours(ms: u64) -> f64 {
    ms as f64 / ONE_HOUR_MS as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    SimulationStarted,
    RequestArrival,
    ClientPickup,
    TripCompleted,
    StationArrival,
    NeedRecharge,
    RechargeStart,
    RechargeEnd,
    TrafficChange,
    RepositionRun,
    Tick,
}

/// Data captured by an event at scheduling time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventSubject {
    Request(RequestId),
    Vehicle(VehicleId),
    Trip(TripId),
    /// Index into the [crate::systems::traffic::TrafficTimeline].
    Traffic(usize),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    pub priority: i32,
    pub seq: u64,
    pub subject: Option<EventSubject>,
}

impl Eq for Event {}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so that BinaryHeap pops the smallest key first.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event being processed by the current schedule run.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    next_seq: u64,
    events: BinaryHeap<Event>,
}

impl SimulationClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_with_priority(timestamp, kind, 0, subject);
    }

    /// Schedules an event. Timestamps in the past are clamped to now.
    pub fn schedule_with_priority(
        &mut self,
        timestamp: u64,
        kind: EventKind,
        priority: i32,
        subject: Option<EventSubject>,
    ) {
        let timestamp = timestamp.max(self.now);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Event {
            timestamp,
            kind,
            priority,
            seq,
            subject,
        });
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now.saturating_add(delay_ms), kind, subject);
    }

    pub fn schedule_in_hours(
        &mut self,
        hours: f64,
        kind: EventKind,
        subject: Option<EventSubject>,
    ) {
        self.schedule_in(hours_to_ms(hours), kind, subject);
    }

    /// Moves the clock without popping an event. Test setup only.
    #[cfg(any(test, feature = "test-helpers"))]
    pub fn set_now(&mut self, timestamp: u64) {
        self.now = timestamp;
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|event| event.timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}
