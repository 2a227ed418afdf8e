//! Read-only snapshots of simulation state for display collaborators.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;

use crate::clock::ONE_MIN_MS;
use crate::fleet::{VehicleId, VehicleState};
use crate::requests::{RequestId, RequestState};
use crate::trip::TripId;

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub label: String,
    pub location: String,
    pub state: VehicleState,
    pub autonomy_pct: f64,
    pub passengers: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TripSnapshot {
    pub id: TripId,
    pub vehicle: VehicleId,
    pub request: Option<RequestId>,
    pub current_node: String,
    pub destination: String,
    pub progress_pct: f64,
}

/// Aggregated counts at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SnapshotCounts {
    pub vehicles_available: usize,
    pub vehicles_en_route: usize,
    pub vehicles_refueling: usize,
    pub vehicles_unavailable: usize,
    pub vehicles_maintenance: usize,
    pub active_trips: usize,
    pub requests_pending: usize,
    pub requests_in_progress: usize,
    pub requests_completed: usize,
    pub requests_rejected: usize,
    pub requests_cancelled: usize,
}

impl SnapshotCounts {
    pub fn add_vehicle(&mut self, state: VehicleState) {
        match state {
            VehicleState::Available => self.vehicles_available += 1,
            VehicleState::EnRoute => self.vehicles_en_route += 1,
            VehicleState::Refueling => self.vehicles_refueling += 1,
            VehicleState::Unavailable => self.vehicles_unavailable += 1,
            VehicleState::Maintenance => self.vehicles_maintenance += 1,
        }
    }

    pub fn add_request(&mut self, state: RequestState) {
        match state {
            RequestState::Pending => self.requests_pending += 1,
            RequestState::InProgress => self.requests_in_progress += 1,
            RequestState::Completed => self.requests_completed += 1,
            RequestState::Rejected => self.requests_rejected += 1,
            RequestState::Cancelled => self.requests_cancelled += 1,
        }
    }
}

/// Snapshot of simulation state at a specific timestamp (simulation ms).
#[derive(Debug, Clone, PartialEq)]
pub struct SimSnapshot {
    pub timestamp_ms: u64,
    pub counts: SnapshotCounts,
    pub vehicles: Vec<VehicleSnapshot>,
    pub trips: Vec<TripSnapshot>,
}

/// Snapshot capture configuration.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimSnapshotConfig {
    pub interval_ms: u64,
    pub max_snapshots: usize,
}

impl Default for SimSnapshotConfig {
    fn default() -> Self {
        Self {
            interval_ms: ONE_MIN_MS,
            max_snapshots: 10_000,
        }
    }
}

/// Rolling snapshot buffer. The oldest snapshot is dropped once `max_snapshots` is hit.
#[derive(Debug, Default, Resource)]
pub struct SimSnapshots {
    pub snapshots: VecDeque<SimSnapshot>,
    pub last_snapshot_at: Option<u64>,
}

impl SimSnapshots {
    pub fn push(&mut self, snapshot: SimSnapshot, max_snapshots: usize) {
        self.last_snapshot_at = Some(snapshot.timestamp_ms);
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > max_snapshots.max(1) {
            self.snapshots.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&SimSnapshot> {
        self.snapshots.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(at: u64) -> SimSnapshot {
        SimSnapshot {
            timestamp_ms: at,
            counts: SnapshotCounts::default(),
            vehicles: Vec::new(),
            trips: Vec::new(),
        }
    }

    #[test]
    fn ring_buffer_drops_oldest() {
        let mut buffer = SimSnapshots::default();
        for at in 0..5 {
            buffer.push(empty(at), 3);
        }
        let kept: Vec<u64> = buffer.snapshots.iter().map(|s| s.timestamp_ms).collect();
        assert_eq!(kept, vec![2, 3, 4]);
        assert_eq!(buffer.last_snapshot_at, Some(4));
        assert_eq!(buffer.latest().map(|s| s.timestamp_ms), Some(4));
    }
}
