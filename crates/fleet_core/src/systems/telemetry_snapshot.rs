use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::SimulationClock;
use crate::fleet::Fleet;
use crate::lifecycle::TripManager;
use crate::requests::RequestBook;
use crate::telemetry::{
    SimSnapshot, SimSnapshotConfig, SimSnapshots, SnapshotCounts, TripSnapshot, VehicleSnapshot,
};

pub fn capture_snapshot_system(
    clock: Res<SimulationClock>,
    config: Res<SimSnapshotConfig>,
    fleet: Res<Fleet>,
    trips: Res<TripManager>,
    requests: Res<RequestBook>,
    mut snapshots: ResMut<SimSnapshots>,
) {
    let mut counts = SnapshotCounts::default();

    let vehicles: Vec<VehicleSnapshot> = fleet
        .iter()
        .map(|vehicle| {
            counts.add_vehicle(vehicle.state);
            VehicleSnapshot {
                id: vehicle.id,
                label: vehicle.label.clone(),
                location: vehicle.location.clone(),
                state: vehicle.state,
                autonomy_pct: vehicle.autonomy_pct(),
                passengers: vehicle.passengers,
            }
        })
        .collect();

    let trips: Vec<TripSnapshot> = trips
        .iter_active()
        .map(|trip| TripSnapshot {
            id: trip.id,
            vehicle: trip.vehicle,
            request: trip.request(),
            current_node: trip.current_node().to_string(),
            destination: trip.destination().unwrap_or_default().to_string(),
            progress_pct: trip.progress_pct(),
        })
        .collect();
    counts.active_trips = trips.len();

    for request in requests.iter() {
        counts.add_request(request.state);
    }

    snapshots.push(
        SimSnapshot {
            timestamp_ms: clock.now(),
            counts,
            vehicles,
            trips,
        },
        config.max_snapshots,
    );
}
