use serde::{Deserialize, Serialize};

use crate::fleet::{Propulsion, Vehicle};
use crate::requests::Request;

use super::algorithm::AllocationStrategy;
use super::types::{Allocation, AllocationContext};

/// Weights of the heuristic score. Lower scores win.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeuristicWeights {
    pub distance: f64,
    pub cost_per_km: f64,
    pub autonomy: f64,
    /// Added for combustion vehicles when the request prefers low emissions.
    pub eco_penalty: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            distance: 1.0,
            cost_per_km: 10.0,
            autonomy: 0.01,
            eco_penalty: 5.0,
        }
    }
}

/// Weighted sum of distance to the client, operating cost and remaining autonomy.
#[derive(Debug, Default)]
pub struct HeuristicAllocation {
    pub weights: HeuristicWeights,
}

impl HeuristicAllocation {
    pub fn new(weights: HeuristicWeights) -> Self {
        Self { weights }
    }

    pub fn score(&self, vehicle: &Vehicle, request: &Request, distance_to_client: f64) -> f64 {
        let w = &self.weights;
        let mut score = w.distance * distance_to_client + w.cost_per_km * vehicle.cost_per_km
            - w.autonomy * vehicle.autonomy_km;
        if request.eco_preference && matches!(vehicle.propulsion, Propulsion::Combustion) {
            score += w.eco_penalty;
        }
        score
    }
}

impl AllocationStrategy for HeuristicAllocation {
    fn name(&self) -> &'static str {
        "heuristic"
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
            let score = self.score(vehicle, request, allocation.distance_to_client);
            // Strict comparison keeps the earlier candidate on ties.
            if best.as_ref().map_or(true, |(_, best_score)| score < *best_score) {
                best = Some((allocation, score));
            }
        }
        best.map(|(allocation, _)| allocation)
    }
}
