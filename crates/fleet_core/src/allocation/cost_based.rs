use crate::fleet::Vehicle;
use crate::requests::Request;

use super::algorithm::AllocationStrategy;
use super::types::{Allocation, AllocationContext};

/// Projected operating cost of serving the request, including any station stop.
/// Selects the candidate with the lowest projected cost.
#[derive(Debug, Default)]
pub struct CostBasedAllocation;

impl CostBasedAllocation {
    fn projected_cost(vehicle: &Vehicle, allocation: &Allocation, request_distance: f64) -> f64 {
        (allocation.distance_to_client + request_distance) * vehicle.cost_per_km
            + allocation.recharge_cost()
    }
}

impl AllocationStrategy for CostBasedAllocation {
    fn name(&self) -> &'static str {
        "cost_based"
    }

    fn select_vehicle(
        &self,
        request: &Request,
        candidates: &[&Vehicle],
        ctx: &AllocationContext<'_>,
        _request_route: &[String],
        request_distance: f64,
    ) -> Option<Allocation> {
        let mut best: Option<(Allocation, f64)> = None;
        for allocation in self.feasible(request, candidates, ctx, request_distance) {
            let Some(vehicle) = candidates.iter().find(|v| v.id == allocation.vehicle) else {
                continue;
            };
            let cost = Self::projected_cost(vehicle, &allocation, request_distance);
            if best.as_ref().map_or(true, |(_, best_cost)| cost < *best_cost) {
                best = Some((allocation, cost));
            }
        }
        best.map(|(allocation, _)| allocation)
    }
}
