//! Metrics sink: counters, per-event records and derived KPIs.
//!
//! Systems call the `record_*` methods exactly once per occurrence. The sink never feeds
//! back into simulation decisions.

use std::fmt;

use bevy_ecs::prelude::Resource;
use serde::Serialize;

use crate::fleet::VehicleId;
use crate::requests::RequestId;
use crate::trip::TripId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RejectionReason {
    RouteNotFound,
    NoFeasibleVehicle,
    /// Allocation succeeded but the trip could not be started.
    TripStartFailed,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RejectionReason::RouteNotFound => "route not found",
            RejectionReason::NoFeasibleVehicle => "no vehicle with enough autonomy or capacity",
            RejectionReason::TripStartFailed => "trip could not be started",
        };
        f.write_str(text)
    }
}

/// One accepted request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRecord {
    pub request: RequestId,
    pub vehicle: VehicleId,
    pub accepted_at: u64,
    /// Minutes the vehicle needs to reach the client.
    pub response_minutes: f64,
    pub distance_km: f64,
    pub cost: f64,
    pub emissions_kg: f64,
    pub shared: bool,
    pub picked_up_at: Option<u64>,
    pub completed_at: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectionRecord {
    pub request: RequestId,
    pub at: u64,
    pub reason: RejectionReason,
    pub penalty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecalculationRecord {
    pub at: u64,
    pub trip: TripId,
    pub vehicle: VehicleId,
    pub edge: String,
    pub minutes_delta: f64,
    pub distance_delta_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RechargeRecord {
    pub at: u64,
    pub vehicle: VehicleId,
    pub station: String,
    pub minutes: f64,
    pub autonomy_added_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepositionRecord {
    pub at: u64,
    pub vehicle: VehicleId,
    pub from: String,
    pub to: String,
    pub distance_km: f64,
}

/// Derived indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub accepted: usize,
    pub rejected: usize,
    pub service_rate_pct: f64,
    pub mean_response_minutes: f64,
    pub total_distance_km: f64,
    pub total_cost: f64,
    pub cost_per_km: f64,
    pub total_emissions_kg: f64,
    pub emissions_per_km: f64,
    pub occupancy_pct: f64,
}

#[derive(Debug, Default, Resource)]
pub struct FleetMetrics {
    pub trips: Vec<TripRecord>,
    pub rejections: Vec<RejectionRecord>,
    pub recalculations: Vec<RecalculationRecord>,
    pub recharges: Vec<RechargeRecord>,
    pub repositions: Vec<RepositionRecord>,
    pub stranded: Vec<(u64, VehicleId)>,
    pub completed: usize,
    /// Operating cost of accepted trips.
    pub operating_cost: f64,
    pub penalty_cost: f64,
    pub busy_minutes: f64,
    pub idle_minutes: f64,
}

impl FleetMetrics {
    pub fn accepted(&self) -> usize {
        self.trips.len()
    }

    pub fn rejected(&self) -> usize {
        self.rejections.len()
    }

    /// Operating cost plus rejection penalties.
    pub fn total_cost(&self) -> f64 {
        self.operating_cost + self.penalty_cost
    }

    pub fn total_distance_km(&self) -> f64 {
        self.trips.iter().map(|t| t.distance_km).sum()
    }

    pub fn total_emissions_kg(&self) -> f64 {
        self.trips.iter().map(|t| t.emissions_kg).sum()
    }

    pub fn record_accepted(&mut self, record: TripRecord) {
        self.operating_cost += record.cost;
        self.trips.push(record);
    }

    pub fn record_rejected(
        &mut self,
        request: RequestId,
        at: u64,
        reason: RejectionReason,
        penalty: f64,
    ) {
        let penalty = penalty.max(0.0);
        self.penalty_cost += penalty;
        self.rejections.push(RejectionRecord {
            request,
            at,
            reason,
            penalty,
        });
    }

    pub fn record_pickup(&mut self, request: RequestId, at: u64) {
        if let Some(record) = self
            .trips
            .iter_mut()
            .rev()
            .find(|record| record.request == request && record.picked_up_at.is_none())
        {
            record.picked_up_at = Some(at);
        }
    }

    /// An accepted request whose trip could not be started after all (a queued request
    /// after its station stop). The acceptance is withdrawn and replaced by a rejection.
    pub fn record_start_failed(&mut self, request: RequestId, at: u64, penalty: f64) {
        if let Some(index) = self.trips.iter().rposition(|record| record.request == request) {
            let record = self.trips.remove(index);
            self.operating_cost -= record.cost;
        }
        self.record_rejected(request, at, RejectionReason::TripStartFailed, penalty);
    }

    /// Marks the request's trip as completed. Returns `false` if it was already marked
    /// or never accepted.
    pub fn record_trip_concluded(&mut self, request: RequestId, at: u64) -> bool {
        let Some(record) = self
            .trips
            .iter_mut()
            .rev()
            .find(|record| record.request == request)
        else {
            return false;
        };
        if record.completed_at.is_some() {
            return false;
        }
        record.completed_at = Some(at);
        self.completed += 1;
        true
    }

    pub fn record_recalculation(&mut self, record: RecalculationRecord) {
        self.recalculations.push(record);
    }

    pub fn record_recharge(&mut self, record: RechargeRecord) {
        self.recharges.push(record);
    }

    pub fn record_reposition(&mut self, record: RepositionRecord) {
        self.repositions.push(record);
    }

    pub fn record_stranded(&mut self, at: u64, vehicle: VehicleId) {
        self.stranded.push((at, vehicle));
    }

    pub fn record_occupancy(&mut self, busy_minutes: f64, idle_minutes: f64) {
        self.busy_minutes += busy_minutes.max(0.0);
        self.idle_minutes += idle_minutes.max(0.0);
    }

    pub fn recalculation_minutes(&self) -> f64 {
        self.recalculations.iter().map(|r| r.minutes_delta).sum()
    }

    pub fn service_rate_pct(&self) -> f64 {
        let total = self.accepted() + self.rejected();
        if total == 0 {
            return 0.0;
        }
        self.accepted() as f64 / total as f64 * 100.0
    }

    pub fn mean_response_minutes(&self) -> f64 {
        if self.trips.is_empty() {
            return 0.0;
        }
        self.trips.iter().map(|t| t.response_minutes).sum::<f64>() / self.trips.len() as f64
    }

    pub fn cost_per_km(&self) -> f64 {
        let distance = self.total_distance_km();
        if distance == 0.0 {
            return 0.0;
        }
        self.operating_cost / distance
    }

    pub fn emissions_per_km(&self) -> f64 {
        let distance = self.total_distance_km();
        if distance == 0.0 {
            return 0.0;
        }
        self.total_emissions_kg() / distance
    }

    pub fn occupancy_pct(&self) -> f64 {
        let total = self.busy_minutes + self.idle_minutes;
        if total == 0.0 {
            return 0.0;
        }
        self.busy_minutes / total * 100.0
    }

    pub fn kpis(&self) -> Kpis {
        Kpis {
            accepted: self.accepted(),
            rejected: self.rejected(),
            service_rate_pct: self.service_rate_pct(),
            mean_response_minutes: self.mean_response_minutes(),
            total_distance_km: self.total_distance_km(),
            total_cost: self.total_cost(),
            cost_per_km: self.cost_per_km(),
            total_emissions_kg: self.total_emissions_kg(),
            emissions_per_km: self.emissions_per_km(),
            occupancy_pct: self.occupancy_pct(),
        }
    }

    pub fn report(&self) -> String {
        let k = self.kpis();
        let rule = "=".repeat(60);
        let lines = [
            rule.clone(),
            "SIMULATION METRICS".to_string(),
            rule.clone(),
            format!("Requests served: {}", k.accepted),
            format!("Requests rejected: {}", k.rejected),
            format!("Service rate: {:.2}%", k.service_rate_pct),
            format!("Trips completed: {}", self.completed),
            String::new(),
            format!("Mean response time: {:.2} min", k.mean_response_minutes),
            format!("Total distance: {:.2} km", k.total_distance_km),
            format!("Total cost: {:.2} (penalties {:.2})", k.total_cost, self.penalty_cost),
            format!("Cost per km: {:.3}", k.cost_per_km),
            String::new(),
            format!("Total emissions: {:.2} kg CO2", k.total_emissions_kg),
            format!("Emissions per km: {:.3} kg CO2/km", k.emissions_per_km),
            String::new(),
            format!("Fleet occupancy: {:.2}%", k.occupancy_pct),
            format!(
                "Route recalculations: {} ({:+.1} min)",
                self.recalculations.len(),
                self.recalculation_minutes()
            ),
            format!("Recharges: {}", self.recharges.len()),
            format!("Repositioning moves: {}", self.repositions.len()),
            format!("Vehicles stranded: {}", self.stranded.len()),
            rule,
        ];
        lines.join("\n")
    }
}
