//! Searches that ignore edge weights.

use std::collections::VecDeque;

use crate::fleet::Vehicle;
use crate::graph::{CityGraph, NodeId, Route};

use super::{reconstruct, resolve, Endpoints, RouteStrategy};

/// Breadth-first search: the route with the fewest edges.
#[derive(Debug, Default, Clone, Copy)]
pub struct BreadthFirst;

impl RouteStrategy for BreadthFirst {
    fn name(&self) -> &'static str {
        "breadth_first"
    }

    fn route(
        &self,
        graph: &CityGraph,
        origin: &str,
        destination: &str,
        _vehicle: Option<&Vehicle>,
    ) -> Option<Route> {
        let (from, to) = match resolve(graph, origin, destination)? {
            Endpoints::Trivial(route) => return Some(route),
            Endpoints::Search(from, to) => (from, to),
        };

        let mut visited = vec![false; graph.node_count()];
        let mut parents: Vec<Option<NodeId>> = vec![None; graph.node_count()];
        let mut queue = VecDeque::from([from]);
        visited[from.index()] = true;

        while let Some(current) = queue.pop_front() {
            for (next, edge) in graph.neighbours(current) {
                if visited[next.index()] || edge.traffic.is_blocking() {
                    continue;
                }
                visited[next.index()] = true;
                parents[next.index()] = Some(current);
                if next == to {
                    return Some(reconstruct(graph, &parents, to));
                }
                queue.push_back(next);
            }
        }
        None
    }
}

/// Depth-first search: the first route found, no optimality.
#[derive(Debug, Default, Clone, Copy)]
pub struct DepthFirst;

impl DepthFirst {
    fn explore(
        graph: &CityGraph,
        current: NodeId,
        target: NodeId,
        visited: &mut [bool],
        path: &mut Vec<NodeId>,
    ) -> bool {
        visited[current.index()] = true;
        path.push(current);
        if current == target {
            return true;
        }
        for (next, edge) in graph.neighbours(current) {
            if visited[next.index()] || edge.traffic.is_blocking() {
                continue;
            }
            if Self::explore(graph, next, target, visited, path) {
                return true;
            }
        }
        path.pop();
        false
    }
}

impl RouteStrategy for DepthFirst {
    fn name(&self) -> &'static str {
        "depth_first"
    }

    fn route(
        &self,
        graph: &CityGraph,
        origin: &str,
        destination: &str,
        _vehicle: Option<&Vehicle>,
    ) -> Option<Route> {
        let (from, to) = match resolve(graph, origin, destination)? {
            Endpoints::Trivial(route) => return Some(route),
            Endpoints::Search(from, to) => (from, to),
        };

        let mut visited = vec![false; graph.node_count()];
        let mut path = Vec::new();
        Self::explore(graph, from, to, &mut visited, &mut path).then(|| graph.names(&path))
    }
}
