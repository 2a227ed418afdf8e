//! Cost-aware searches: uniform cost and A*.

use std::collections::BinaryHeap;

use crate::cost::{CostFunction, Heuristic};
use crate::fleet::Vehicle;
use crate::graph::{CityGraph, NodeId, Route};

use super::{reconstruct, resolve, Endpoints, Frontier, RouteStrategy};

/// Best-first search over `g + h`. With a zero heuristic this is Dijkstra.
fn best_first(
    graph: &CityGraph,
    from: NodeId,
    to: NodeId,
    cost: &CostFunction,
    heuristic: &Heuristic,
    vehicle: Option<&Vehicle>,
) -> Option<Route> {
    let mut best = vec![f64::INFINITY; graph.node_count()];
    let mut parents: Vec<Option<NodeId>> = vec![None; graph.node_count()];
    let mut heap = BinaryHeap::new();
    let mut seq = 0_u64;

    best[from.index()] = 0.0;
    heap.push(Frontier {
        priority: heuristic.estimate(graph, from, to),
        cost: 0.0,
        seq,
        node: from,
    });

    while let Some(entry) = heap.pop() {
        if entry.cost > best[entry.node.index()] {
            continue;
        }
        if entry.node == to {
            return Some(reconstruct(graph, &parents, to));
        }
        for (next, edge) in graph.neighbours(entry.node) {
            if edge.traffic.is_blocking() {
                continue;
            }
            let step = cost.edge_cost(&edge, vehicle);
            if !step.is_finite() {
                continue;
            }
            let candidate = entry.cost + step;
            if candidate < best[next.index()] {
                best[next.index()] = candidate;
                parents[next.index()] = Some(entry.node);
                seq += 1;
                heap.push(Frontier {
                    priority: candidate + heuristic.estimate(graph, next, to),
                    cost: candidate,
                    seq,
                    node: next,
                });
            }
        }
    }
    None
}

/// Uniform cost search: the minimum-cost route under the injected cost function.
#[derive(Debug, Default, Clone, Copy)]
pub struct UniformCost {
    cost: CostFunction,
}

impl UniformCost {
    pub fn new(cost: CostFunction) -> Self {
        Self { cost }
    }
}

impl RouteStrategy for UniformCost {
    fn name(&self) -> &'static str {
        "uniform_cost"
    }

    fn route(
        &self,
        graph: &CityGraph,
        origin: &str,
        destination: &str,
        vehicle: Option<&Vehicle>,
    ) -> Option<Route> {
        match resolve(graph, origin, destination)? {
            Endpoints::Trivial(route) => Some(route),
            Endpoints::Search(from, to) => {
                best_first(graph, from, to, &self.cost, &Heuristic::Zero, vehicle)
            }
        }
    }
}

/// A* search. Optimal whenever the heuristic never overestimates the remaining cost;
/// ties on `g + h` go to the lower accumulated cost.
#[derive(Debug, Default, Clone, Copy)]
pub struct AStar {
    cost: CostFunction,
    heuristic: Heuristic,
}

impl AStar {
    pub fn new(cost: CostFunction, heuristic: Heuristic) -> Self {
        Self { cost, heuristic }
    }
}

impl RouteStrategy for AStar {
    fn name(&self) -> &'static str {
        "a_star"
    }

    fn route(
        &self,
        graph: &CityGraph,
        origin: &str,
        destination: &str,
        vehicle: Option<&Vehicle>,
    ) -> Option<Route> {
        match resolve(graph, origin, destination)? {
            Endpoints::Trivial(route) => Some(route),
            Endpoints::Search(from, to) => {
                best_first(graph, from, to, &self.cost, &self.heuristic, vehicle)
            }
        }
    }
}
