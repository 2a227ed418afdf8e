//! Proactive repositioning of idle vehicles toward hot zones.
//!
//! Both active variants share the same move selection: pick the top-k zones, move a
//! fraction of the idle vehicles (at least one), farthest vehicle first, assigning
//! zones round-robin. A vehicle already on its zone or beyond the maximum distance is
//! skipped and the zone goes to the next one. They differ in
//! how zones are ranked: by node attractiveness, or by recent demand.

use std::collections::BTreeMap;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::clock::ONE_MIN_MS;
use crate::fleet::{Vehicle, VehicleId};
use crate::graph::CityGraph;
use crate::requests::{RequestBook, RequestState};

/// Distance assumed when either end has no coordinates.
const UNKNOWN_DISTANCE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RepositionParams {
    pub top_k: usize,
    pub vehicle_fraction: f64,
    pub max_distance: f64,
    pub interval_minutes: u64,
}

impl RepositionParams {
    pub fn attractiveness() -> Self {
        Self {
            top_k: 3,
            vehicle_fraction: 0.3,
            max_distance: 100.0,
            interval_minutes: 15,
        }
    }

    pub fn demand() -> Self {
        Self {
            max_distance: 10.0,
            ..Self::attractiveness()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Resource)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepositioningPolicy {
    #[default]
    Disabled,
    Attractiveness(RepositionParams),
    Demand {
        params: RepositionParams,
        window_minutes: u64,
    },
}

/// One decided move.
#[derive(Debug, Clone, PartialEq)]
pub struct Reposition {
    pub vehicle: VehicleId,
    pub target: String,
}

/// Straight-line distance between two nodes; 0 for the same node, 100 when unknown.
pub fn approximate_distance(graph: &CityGraph, from: &str, to: &str) -> f64 {
    if from == to {
        return 0.0;
    }
    let position = |name: &str| graph.node_by_name(name).and_then(|node| node.position);
    match (position(from), position(to)) {
        (Some((x1, y1)), Some((x2, y2))) => ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt(),
        _ => UNKNOWN_DISTANCE,
    }
}

impl RepositioningPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            RepositioningPolicy::Disabled => "disabled",
            RepositioningPolicy::Attractiveness(_) => "attractiveness",
            RepositioningPolicy::Demand { .. } => "demand",
        }
    }

    pub fn params(&self) -> Option<&RepositionParams> {
        match self {
            RepositioningPolicy::Disabled => None,
            RepositioningPolicy::Attractiveness(params) => Some(params),
            RepositioningPolicy::Demand { params, .. } => Some(params),
        }
    }

    /// Whether enough time has passed since `last_run_at`.
    pub fn is_due(&self, now: u64, last_run_at: Option<u64>) -> bool {
        let Some(params) = self.params() else {
            return false;
        };
        last_run_at.map_or(true, |last| {
            now.saturating_sub(last) >= params.interval_minutes * ONE_MIN_MS
        })
    }

    /// Zones ranked best first, at most `top_k`.
    fn hot_zones(&self, graph: &CityGraph, requests: &RequestBook, now: u64) -> Vec<String> {
        let (mut scored, top_k): (Vec<(String, f64)>, usize) = match self {
            RepositioningPolicy::Disabled => return Vec::new(),
            RepositioningPolicy::Attractiveness(params) => (
                graph
                    .nodes()
                    .iter()
                    .filter(|node| node.attractiveness > 0.0)
                    .map(|node| (node.name.clone(), node.attractiveness))
                    .collect(),
                params.top_k,
            ),
            RepositioningPolicy::Demand {
                params,
                window_minutes,
            } => {
                let window_start = now.saturating_sub(window_minutes * ONE_MIN_MS);
                let mut counts: BTreeMap<&str, f64> = BTreeMap::new();
                for request in requests.iter() {
                    let served = matches!(
                        request.state,
                        RequestState::InProgress | RequestState::Completed
                    );
                    if served && (window_start..=now).contains(&request.desired_at) {
                        *counts.entry(request.origin.as_str()).or_default() += 1.0;
                    }
                }
                (
                    counts
                        .into_iter()
                        .map(|(name, count)| (name.to_string(), count))
                        .collect(),
                    params.top_k,
                )
            }
        };
        // Stable: equal scores keep graph or name order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);
        scored.into_iter().map(|(name, _)| name).collect()
    }

    /// Decides which idle vehicles move where. Returns nothing when disabled, not due,
    /// or when no zone qualifies.
    pub fn decide(
        &self,
        idle: &[&Vehicle],
        graph: &CityGraph,
        requests: &RequestBook,
        now: u64,
        last_run_at: Option<u64>,
    ) -> Vec<Reposition> {
        let Some(params) = self.params() else {
            return Vec::new();
        };
        if idle.is_empty() || !self.is_due(now, last_run_at) {
            return Vec::new();
        }
        let zones = self.hot_zones(graph, requests, now);
        if zones.is_empty() {
            return Vec::new();
        }

        let quota = ((idle.len() as f64 * params.vehicle_fraction) as usize).max(1);

        let mut ordered: Vec<(&Vehicle, f64)> = idle
            .iter()
            .map(|vehicle| {
                let nearest = zones
                    .iter()
                    .map(|zone| approximate_distance(graph, &vehicle.location, zone))
                    .fold(f64::INFINITY, f64::min);
                (*vehicle, nearest)
            })
            .collect();
        ordered.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut moves = Vec::new();
        for (vehicle, _) in ordered {
            if moves.len() >= quota {
                break;
            }
            let target = &zones[moves.len() % zones.len()];
            if vehicle.location == *target {
                continue;
            }
            if approximate_distance(graph, &vehicle.location, target) <= params.max_distance {
                moves.push(Reposition {
                    vehicle: vehicle.id,
                    target: target.clone(),
                });
            }
        }
        moves
    }
}
