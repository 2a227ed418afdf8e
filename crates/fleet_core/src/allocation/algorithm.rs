use crate::fleet::Vehicle;
use crate::requests::Request;

use super::types::{evaluate_candidate, Allocation, AllocationContext};

/// Trait for strategies that pick the vehicle serving a request.
pub trait AllocationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Picks a vehicle for `request` among `candidates`, or `None` when none is feasible.
    ///
    /// `request_route` and `request_distance` describe the origin to destination leg,
    /// already routed by the caller. Recording a rejection is up to the caller.
    fn select_vehicle(
        &self,
        request: &Request,
        candidates: &[&Vehicle],
        ctx: &AllocationContext<'_>,
        request_route: &[String],
        request_distance: f64,
    ) -> Option<Allocation>;

    /// Every feasible candidate in input order. Strategies score these.
    fn feasible(
        &self,
        request: &Request,
        candidates: &[&Vehicle],
        ctx: &AllocationContext<'_>,
        request_distance: f64,
    ) -> Vec<Allocation> {
        candidates
            .iter()
            .filter_map(|vehicle| evaluate_candidate(vehicle, request, ctx, request_distance))
            .collect()
    }
}
