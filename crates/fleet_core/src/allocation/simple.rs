use crate::fleet::Vehicle;
use crate::requests::Request;

use super::algorithm::AllocationStrategy;
use super::types::{evaluate_candidate, Allocation, AllocationContext};

/// First feasible candidate in input order.
///
/// Useful as a baseline: no scoring, deterministic, and it stops at the first vehicle
/// that passes the capacity, reachability and autonomy checks.
#[derive(Debug, Default)]
pub struct SimpleAllocation;

impl AllocationStrategy for SimpleAllocation {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn select_vehicle(
        &self,
        request: &Request,
        candidates: &[&Vehicle],
        ctx: &AllocationContext<'_>,
        _request_route: &[String],
        request_distance: f64,
    ) -> Option<Allocation> {
        candidates
            .iter()
            .find_map(|vehicle| evaluate_candidate(vehicle, request, ctx, request_distance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::fixture::{chain_fixture, vehicle_at};

    #[test]
    fn picks_first_feasible_in_order() {
        let fixture = chain_fixture();
        let request = Request::new(1, "A", "D", 1);
        let full = vehicle_at(0, "B", 0.5).with_autonomy(1.0);
        let ok = vehicle_at(1, "C", 0.5);
        let later = vehicle_at(2, "A", 0.1);

        let chosen = SimpleAllocation
            .select_vehicle(&request, &[&full, &ok, &later], &fixture.ctx(), &[], 3.0)
            .expect("a vehicle");
        assert_eq!(chosen.vehicle, ok.id);
        assert_eq!(chosen.distance_to_client, 2.0);
        assert_eq!(chosen.route_to_client(), ["C", "B", "A"]);
    }
}
