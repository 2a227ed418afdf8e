#![allow(dead_code)]

use fleet_core::fleet::{Propulsion, Vehicle, VehicleId};

/// A combustion vehicle with four seats.
pub fn car(label: &str, location: &str, autonomy_km: f64, cost_per_km: f64) -> Vehicle {
    Vehicle::new(VehicleId(0), label, Propulsion::Combustion, autonomy_km, 4, cost_per_km, location)
}

/// An electric vehicle with four seats recharging at `minutes_per_km`.
pub fn ev(label: &str, location: &str, autonomy_km: f64, minutes_per_km: f64) -> Vehicle {
    Vehicle::new(
        VehicleId(0),
        label,
        Propulsion::Electric {
            recharge_minutes_per_km: minutes_per_km,
        },
        autonomy_km,
        4,
        0.1,
        location,
    )
}
