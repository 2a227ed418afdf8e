//! Simulation configuration.
//!
//! Every field has a default so a partial JSON document (or none at all) is enough.
//! Reading the document from disk or the environment is up to the caller.

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::allocation::AllocatorKind;
use crate::clock::{hours_to_ms, ONE_MIN_MS};
use crate::cost::{CostFunction, Heuristic};
use crate::policies::{RechargePolicy, RepositioningPolicy, RideSharingPolicy};
use crate::routing::RouterKind;

/// Penalty added to the total cost for each rejected request.
pub const DEFAULT_REJECTION_PENALTY: f64 = 100.0;
pub const DEFAULT_DURATION_HOURS: f64 = 8.0;
pub const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 1024;

/// Weather and random demand, sampled on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicConditions {
    pub enabled: bool,
    /// Chance per tick that the weather flips between dry and rain.
    pub weather_toggle_probability: f64,
    /// Chance per tick of a random request. Doubled while raining.
    pub random_request_probability: f64,
    pub seed: u64,
}

impl Default for DynamicConditions {
    fn default() -> Self {
        Self {
            enabled: false,
            weather_toggle_probability: 0.05,
            random_request_probability: 0.05,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct SimulationConfig {
    pub router: RouterKind,
    pub cost: CostFunction,
    pub heuristic: Heuristic,
    pub allocator: AllocatorKind,
    pub recharge: RechargePolicy,
    pub ridesharing: RideSharingPolicy,
    pub repositioning: RepositioningPolicy,
    pub rejection_penalty: f64,
    pub duration_hours: f64,
    /// Interval of the periodic tick driving repositioning and dynamic conditions.
    pub tick_interval_ms: u64,
    pub snapshot_interval_ms: u64,
    pub max_snapshots: usize,
    /// Zero disables the route cache.
    pub route_cache_capacity: usize,
    pub dynamics: DynamicConditions,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            router: RouterKind::default(),
            cost: CostFunction::default(),
            heuristic: Heuristic::default(),
            allocator: AllocatorKind::default(),
            recharge: RechargePolicy::default(),
            ridesharing: RideSharingPolicy::default(),
            repositioning: RepositioningPolicy::default(),
            rejection_penalty: DEFAULT_REJECTION_PENALTY,
            duration_hours: DEFAULT_DURATION_HOURS,
            tick_interval_ms: ONE_MIN_MS,
            snapshot_interval_ms: ONE_MIN_MS,
            max_snapshots: 10_000,
            route_cache_capacity: DEFAULT_ROUTE_CACHE_CAPACITY,
            dynamics: DynamicConditions::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn end_time_ms(&self) -> u64 {
        hours_to_ms(self.duration_hours)
    }

    pub fn with_router(mut self, router: RouterKind) -> Self {
        self.router = router;
        self
    }

    pub fn with_cost(mut self, cost: CostFunction) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn with_allocator(mut self, allocator: AllocatorKind) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn with_recharge(mut self, recharge: RechargePolicy) -> Self {
        self.recharge = recharge;
        self
    }

    pub fn with_ridesharing(mut self, ridesharing: RideSharingPolicy) -> Self {
        self.ridesharing = ridesharing;
        self
    }

    pub fn with_repositioning(mut self, repositioning: RepositioningPolicy) -> Self {
        self.repositioning = repositioning;
        self
    }

    pub fn with_rejection_penalty(mut self, penalty: f64) -> Self {
        self.rejection_penalty = penalty;
        self
    }

    pub fn with_duration_hours(mut self, hours: f64) -> Self {
        self.duration_hours = hours;
        self
    }

    pub fn with_tick_interval_ms(mut self, interval_ms: u64) -> Self {
        self.tick_interval_ms = interval_ms;
        self
    }

    pub fn with_snapshot_interval_ms(mut self, interval_ms: u64) -> Self {
        self.snapshot_interval_ms = interval_ms;
        self
    }

    pub fn with_route_cache_capacity(mut self, capacity: usize) -> Self {
        self.route_cache_capacity = capacity;
        self
    }

    pub fn with_dynamics(mut self, dynamics: DynamicConditions) -> Self {
        self.dynamics = dynamics;
        self
    }
}
