//! Vehicles, the fleet arena and recharge plans.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::graph::{CityGraph, NodeKind, Route};
use crate::requests::RequestId;

/// Fixed refuelling time for combustion vehicles, in minutes.
pub const COMBUSTION_REFUEL_MINUTES: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VehicleId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Propulsion {
    Combustion,
    Electric { recharge_minutes_per_km: f64 },
}

impl Propulsion {
    pub fn is_electric(&self) -> bool {
        matches!(self, Propulsion::Electric { .. })
    }

    /// Station kind this propulsion can refuel at.
    pub fn station_kind(&self) -> NodeKind {
        match self {
            Propulsion::Combustion => NodeKind::FuelStation,
            Propulsion::Electric { .. } => NodeKind::ChargingStation,
        }
    }
}

/// Minutes needed to restore `missing_km` of autonomy.
pub fn refuel_minutes(propulsion: &Propulsion, missing_km: f64) -> f64 {
    match propulsion {
        Propulsion::Combustion => COMBUSTION_REFUEL_MINUTES,
        Propulsion::Electric {
            recharge_minutes_per_km,
        } => recharge_minutes_per_km * missing_km.max(0.0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VehicleState {
    #[default]
    Available,
    EnRoute,
    Unavailable,
    Refueling,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Identifier used by import documents and logs.
    pub label: String,
    pub propulsion: Propulsion,
    pub max_autonomy_km: f64,
    pub autonomy_km: f64,
    pub capacity: u32,
    pub passengers: u32,
    pub cost_per_km: f64,
    /// Name of the node the vehicle is at (or last passed).
    pub location: String,
    pub state: VehicleState,
    pub pending_plan: Option<RechargePlan>,
    /// Request assigned to this vehicle that starts once the pending plan completes.
    pub queued_request: Option<RequestId>,
}

impl Vehicle {
    pub fn new(
        id: VehicleId,
        label: impl Into<String>,
        propulsion: Propulsion,
        max_autonomy_km: f64,
        capacity: u32,
        cost_per_km: f64,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id,
            label: label.into(),
            propulsion,
            max_autonomy_km,
            autonomy_km: max_autonomy_km,
            capacity,
            passengers: 0,
            cost_per_km,
            location: location.into(),
            state: VehicleState::Available,
            pending_plan: None,
            queued_request: None,
        }
    }

    pub fn with_autonomy(mut self, autonomy_km: f64) -> Self {
        self.autonomy_km = autonomy_km.clamp(0.0, self.max_autonomy_km);
        self
    }

    pub fn with_state(mut self, state: VehicleState) -> Self {
        self.state = state;
        self
    }

    pub fn autonomy_pct(&self) -> f64 {
        if self.max_autonomy_km <= 0.0 {
            return 0.0;
        }
        self.autonomy_km / self.max_autonomy_km * 100.0
    }

    pub fn needs_refuel(&self, critical_pct: f64) -> bool {
        self.autonomy_pct() <= critical_pct
    }

    pub fn refuel_minutes(&self) -> f64 {
        refuel_minutes(&self.propulsion, self.max_autonomy_km - self.autonomy_km)
    }

    pub fn can_refuel_at(&self, graph: &CityGraph, node: &str) -> bool {
        graph
            .node_by_name(node)
            .is_some_and(|n| n.kind == self.propulsion.station_kind())
    }

    pub fn spare_capacity(&self) -> u32 {
        self.capacity.saturating_sub(self.passengers)
    }

    pub fn has_capacity_for(&self, passengers: u32) -> bool {
        self.passengers + passengers <= self.capacity
    }

    /// Boards passengers if they fit. The capacity bound is never exceeded.
    pub fn board(&mut self, passengers: u32) -> bool {
        if !self.has_capacity_for(passengers) {
            return false;
        }
        self.passengers += passengers;
        true
    }

    pub fn alight(&mut self, passengers: u32) {
        self.passengers = self.passengers.saturating_sub(passengers);
    }

    pub fn consume(&mut self, distance_km: f64) {
        self.autonomy_km = (self.autonomy_km - distance_km).max(0.0);
    }

    /// Restores full autonomy and returns the km added.
    pub fn refill(&mut self) -> f64 {
        let added = self.max_autonomy_km - self.autonomy_km;
        self.autonomy_km = self.max_autonomy_km;
        added
    }
}

/// Candidate refuel/recharge stop. Owned by value by the vehicle until consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct RechargePlan {
    pub station: String,
    pub station_kind: NodeKind,
    pub route: Route,
    pub distance_km: f64,
    pub travel_hours: f64,
    pub recharge_minutes: f64,
    pub extra_cost: f64,
    pub required_autonomy_km: f64,
    pub safety_margin_km: f64,
}

impl RechargePlan {
    /// Already at the station, or a real route of positive length.
    pub fn is_feasible(&self) -> bool {
        let already_there = self.distance_km == 0.0 && self.route.len() == 1;
        let travels = self.route.len() >= 2 && self.distance_km > 0.0;
        already_there || travels
    }

    pub fn total_hours(&self) -> f64 {
        self.travel_hours + self.recharge_minutes / 60.0
    }
}

/// Arena of vehicles addressed by [VehicleId].
#[derive(Debug, Default, Resource)]
pub struct Fleet {
    vehicles: Vec<Vehicle>,
}

impl Fleet {
    /// Adds a vehicle, overwriting its id with the next arena slot.
    pub fn push(&mut self, mut vehicle: Vehicle) -> VehicleId {
        let id = VehicleId(self.vehicles.len() as u32);
        vehicle.id = id;
        self.vehicles.push(vehicle);
        id
    }

    pub fn get(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(id.0 as usize)
    }

    pub fn by_label(&self, label: &str) -> Option<&Vehicle> {
        self.vehicles.iter().find(|v| v.label == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Vehicle> {
        self.vehicles.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn available(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles
            .iter()
            .filter(|v| v.state == VehicleState::Available)
    }
}
