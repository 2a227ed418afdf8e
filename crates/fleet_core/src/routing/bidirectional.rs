//! Bidirectional breadth-first search.
//!
//! Expands one full layer at a time from whichever side has the smaller frontier:
//! successors from the origin, predecessors from the destination. When a layer
//! produces meeting nodes, the one with the lowest combined depth is spliced into the
//! final route, so the result has the fewest possible edges. Edge weights are ignored.

use crate::fleet::Vehicle;
use crate::graph::{CityGraph, Edge, NodeId, Route};

use super::{resolve, Endpoints, RouteStrategy};

#[derive(Debug, Default, Clone, Copy)]
pub struct Bidirectional;

/// Search state for one direction. `links` points one hop back toward the side's root.
struct Side {
    seen: Vec<bool>,
    depth: Vec<u32>,
    links: Vec<Option<NodeId>>,
    frontier: Vec<NodeId>,
}

impl Side {
    fn rooted_at(root: NodeId, nodes: usize) -> Self {
        let mut seen = vec![false; nodes];
        seen[root.index()] = true;
        Self {
            seen,
            depth: vec![0; nodes],
            links: vec![None; nodes],
            frontier: vec![root],
        }
    }

    /// Expands the whole current layer. Returns the best meeting node discovered, if any.
    fn expand<'g, I>(
        &mut self,
        other: &Side,
        mut adjacent: impl FnMut(NodeId) -> I,
    ) -> Option<NodeId>
    where
        I: Iterator<Item = (NodeId, Edge<'g>)>,
    {
        let mut next_layer = Vec::new();
        let mut meeting: Option<(u32, NodeId)> = None;

        for &current in &self.frontier {
            for (next, edge) in adjacent(current) {
                if edge.traffic.is_blocking() || self.seen[next.index()] {
                    continue;
                }
                self.seen[next.index()] = true;
                self.depth[next.index()] = self.depth[current.index()] + 1;
                self.links[next.index()] = Some(current);
                next_layer.push(next);

                if other.seen[next.index()] {
                    let total = self.depth[next.index()] + other.depth[next.index()];
                    if meeting.map_or(true, |(best, _)| total < best) {
                        meeting = Some((total, next));
                    }
                }
            }
        }

        self.frontier = next_layer;
        meeting.map(|(_, node)| node)
    }
}

fn splice(graph: &CityGraph, forward: &Side, backward: &Side, meet: NodeId) -> Route {
    let mut ids = vec![meet];
    let mut current = meet;
    while let Some(previous) = forward.links[current.index()] {
        ids.push(previous);
        current = previous;
    }
    ids.reverse();

    current = meet;
    while let Some(next) = backward.links[current.index()] {
        ids.push(next);
        current = next;
    }
    graph.names(&ids)
}

impl RouteStrategy for Bidirectional {
    fn name(&self) -> &'static str {
        "bidirectional"
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

        let mut forward = Side::rooted_at(from, graph.node_count());
        let mut backward = Side::rooted_at(to, graph.node_count());

        while !forward.frontier.is_empty() && !backward.frontier.is_empty() {
            let meet = if forward.frontier.len() <= backward.frontier.len() {
                forward.expand(&backward, |node| graph.neighbours(node))
            } else {
                backward.expand(&forward, |node| graph.predecessors(node))
            };
            if let Some(meet) = meet {
                return Some(splice(graph, &forward, &backward, meet));
            }
        }
        None
    }
}
