pub mod dynamics;
pub mod pickup;
pub mod progress;
pub mod recharge;
pub mod repositioning;
pub mod request_arrival;
pub mod start;
pub mod telemetry_snapshot;
pub mod traffic;
pub mod trip_completed;

use crate::clock::{hours_to_ms, EventKind, EventSubject, SimulationClock, RECHARGE_PRIORITY};
use crate::trip::Trip;

/// Books the pickup (passenger trips whose pickup was not announced yet), the arrival
/// at a refuel stop ahead and the completion of `trip` from its current position.
/// Called again after every reroute; handlers ignore the copies that went stale.
pub(crate) fn schedule_trip_events(clock: &mut SimulationClock, trip: &Trip) {
    let now = clock.now();
    let subject = Some(EventSubject::Trip(trip.id));
    let remaining = trip.remaining_hours();
    if !remaining.is_finite() {
        log::warn!("trip {} has a blocked segment ahead, not scheduling", trip.id.0);
        return;
    }
    if trip.request().is_some() && !trip.pickup_reported {
        let pickup = now + hours_to_ms(trip.hours_until(trip.pickup_index));
        clock.schedule_at(pickup, EventKind::ClientPickup, subject);
    }
    if let Some(stop) = trip.stop_ahead() {
        let arrival = now + hours_to_ms(trip.hours_until(stop.index));
        clock.schedule_with_priority(
            arrival,
            EventKind::StationArrival,
            RECHARGE_PRIORITY,
            Some(EventSubject::Vehicle(trip.vehicle)),
        );
    }
    clock.schedule_at(now + hours_to_ms(remaining), EventKind::TripCompleted, subject);
}
