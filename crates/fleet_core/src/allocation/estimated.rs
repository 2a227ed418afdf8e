use crate::fleet::Vehicle;
use crate::requests::Request;

use super::algorithm::AllocationStrategy;
use super::types::{Allocation, AllocationContext};

/// A*-style score: routed distance to the client, plus the heuristic estimate from the
/// vehicle to the origin, plus the operating cost of the request leg.
#[derive(Debug, Default)]
pub struct EstimatedAllocation;

impl AllocationStrategy for EstimatedAllocation {
    fn name(&self) -> &'static str {
        "estimated"
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
            let estimate = ctx
                .heuristic
                .estimate_by_name(ctx.graph, &vehicle.location, &request.origin);
            let score = allocation.distance_to_client
                + estimate
                + request_distance * vehicle.cost_per_km;
            if best.as_ref().map_or(true, |(_, best_score)| score < *best_score) {
                best = Some((allocation, score));
            }
        }
        best.map(|(allocation, _)| allocation)
    }
}
