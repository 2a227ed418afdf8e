//! Vehicle allocation: choosing which vehicle serves a request.

pub mod algorithm;
pub mod cost_based;
pub mod estimated;
pub mod heuristic;
pub mod simple;
pub mod types;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

pub use algorithm::AllocationStrategy;
pub use cost_based::CostBasedAllocation;
pub use estimated::EstimatedAllocation;
pub use heuristic::{HeuristicAllocation, HeuristicWeights};
pub use simple::SimpleAllocation;
pub use types::{evaluate_candidate, Allocation, AllocationContext, Approach};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocatorKind {
    Simple,
    Heuristic(HeuristicWeights),
    CostBased,
    Estimated,
}

impl Default for AllocatorKind {
    fn default() -> Self {
        AllocatorKind::Heuristic(HeuristicWeights::default())
    }
}

pub fn build_allocator(kind: AllocatorKind) -> Box<dyn AllocationStrategy> {
    match kind {
        AllocatorKind::Simple => Box::new(SimpleAllocation),
        AllocatorKind::Heuristic(weights) => Box::new(HeuristicAllocation::new(weights)),
        AllocatorKind::CostBased => Box::new(CostBasedAllocation),
        AllocatorKind::Estimated => Box::new(EstimatedAllocation),
    }
}

/// Resource wrapper for the allocation strategy trait object.
#[derive(Resource)]
pub struct AllocatorResource(pub Box<dyn AllocationStrategy>);

impl AllocatorResource {
    pub fn new(strategy: Box<dyn AllocationStrategy>) -> Self {
        Self(strategy)
    }
}

impl std::ops::Deref for AllocatorResource {
    type Target = dyn AllocationStrategy;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}


#[cfg(test)]
mod tests {
    use super::fixture::{chain_fixture, vehicle_at};
    use super::*;
    use crate::fleet::VehicleState;
    use crate::graph::{EdgeSpec, NodeKind, NodeSpec};
    use crate::requests::Request;

    #[test]
    fn every_kind_builds_and_names_itself() {
        for (kind, name) in [
            (AllocatorKind::Simple, "simple"),
            (AllocatorKind::default(), "heuristic"),
            (AllocatorKind::CostBased, "cost_based"),
            (AllocatorKind::Estimated, "estimated"),
        ] {
            assert_eq!(build_allocator(kind).name(), name);
        }
    }

    #[test]
    fn busy_or_full_vehicles_are_skipped() {
        let fixture = chain_fixture();
        let request = Request::new(1, "A", "D", 3);
        let busy = vehicle_at(0, "A", 0.1).with_state(VehicleState::Maintenance);
        let mut full = vehicle_at(1, "A", 0.1);
        full.passengers = 2;
        assert!(evaluate_candidate(&busy, &request, &fixture.ctx(), 3.0).is_none());
        assert!(evaluate_candidate(&full, &request, &fixture.ctx(), 3.0).is_none());
    }

    #[test]
    fn short_autonomy_falls_back_to_station_stop() {
        let mut fixture = chain_fixture();
        fixture
            .graph
            .add_node(NodeSpec::new("F").with_kind(NodeKind::FuelStation))
            .unwrap();
        fixture
            .graph
            .add_edge("C", "F", EdgeSpec::new("CF", 1.0, 1.0))
            .unwrap();
        let low = vehicle_at(0, "C", 0.1).with_autonomy(3.0);
        let request = Request::new(1, "A", "D", 1);

        let allocation = evaluate_candidate(&low, &request, &fixture.ctx(), 3.0).unwrap();
        let Approach::ViaStation(plan) = &allocation.approach else {
            panic!("expected a station stop, got {:?}", allocation.approach);
        };
        assert_eq!(plan.plan.station, "F");
        assert_eq!(allocation.distance_to_client, 4.0);
        assert_eq!(allocation.route_to_client(), ["F", "C", "B", "A"]);
    }
}
