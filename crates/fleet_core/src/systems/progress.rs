use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{SimulationClock, ONE_MIN_MS};
use crate::fleet::{Fleet, VehicleState};
use crate::lifecycle::TripManager;
use crate::metrics::FleetMetrics;

/// Brings every active trip up to the current instant.
///
/// Runs first on every event so handlers always see live positions. Also books the
/// elapsed time as busy (en route, refuelling) or idle (available) per vehicle.
pub fn trip_progress_system(
    clock: Res<SimulationClock>,
    mut trips: ResMut<TripManager>,
    mut fleet: ResMut<Fleet>,
    mut metrics: ResMut<FleetMetrics>,
) {
    let now = clock.now();
    let elapsed_ms = now.saturating_sub(trips.last_progress_at());
    if elapsed_ms == 0 {
        return;
    }

    let minutes = elapsed_ms as f64 / ONE_MIN_MS as f64;
    let (mut busy, mut idle) = (0.0, 0.0);
    for vehicle in fleet.iter() {
        match vehicle.state {
            VehicleState::EnRoute | VehicleState::Refueling => busy += minutes,
            VehicleState::Available => idle += minutes,
            VehicleState::Unavailable | VehicleState::Maintenance => {}
        }
    }
    metrics.record_occupancy(busy, idle);

    trips.advance_all(now, &mut fleet);
}
