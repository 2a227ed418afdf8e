use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock, RECHARGE_PRIORITY};
use crate::fleet::Fleet;
use crate::lifecycle::TripManager;
use crate::metrics::FleetMetrics;
use crate::policies::RechargePolicy;

/// Announces that a vehicle reached its client.
///
/// Pickup events rescheduled by a reroute leave stale copies on the clock; only the
/// first one fired after the client is actually reached counts. Under the during-trip
/// recharge policy this is also where a low vehicle asks for a recharge check.
pub fn client_pickup_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    recharge: Res<RechargePolicy>,
    fleet: Res<Fleet>,
    mut trips: ResMut<TripManager>,
    mut metrics: ResMut<FleetMetrics>,
) {
    let Some(EventSubject::Trip(id)) = event.0.subject else {
        return;
    };
    if !trips.report_pickup(id) {
        return;
    }
    let Some(trip) = trips.get(id) else {
        return;
    };
    let Some(request) = trip.request() else {
        return;
    };
    let now = clock.now();
    metrics.record_pickup(request, now);

    let Some(vehicle) = fleet.get(trip.vehicle) else {
        return;
    };
    log::info!(
        "vehicle {} picked up request {} at {}",
        vehicle.label,
        request.0,
        trip.client_node().unwrap_or("?")
    );

    let during_trip = matches!(*recharge, RechargePolicy::DuringTrip { .. });
    if during_trip && recharge.should_schedule(vehicle, &trips) {
        clock.schedule_with_priority(
            now,
            EventKind::NeedRecharge,
            RECHARGE_PRIORITY,
            Some(EventSubject::Vehicle(vehicle.id)),
        );
    }
}
