//! City graph: named locations joined by directed edges with a mutable traffic level.
//!
//! Undirected graphs store both directions as independent edges. Directional copies
//! that share a name also share one traffic slot, so a traffic change on a named edge
//! is seen by every copy.

use std::collections::HashMap;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ordered sequence of node names.
pub type Route = Vec<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    Location,
    FuelStation,
    ChargingStation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub position: Option<(f64, f64)>,
    /// Non-negative weight used by repositioning and random request sampling.
    pub attractiveness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrafficLevel {
    Empty,
    #[default]
    Normal,
    Heavy,
    VeryHeavy,
    Accident,
}

impl TrafficLevel {
    /// Multiplier applied to free-flow traversal time. Accidents block the edge.
    pub fn multiplier(self) -> f64 {
        match self {
            TrafficLevel::Empty => 0.5,
            TrafficLevel::Normal => 1.0,
            TrafficLevel::Heavy => 1.5,
            TrafficLevel::VeryHeavy => 2.0,
            TrafficLevel::Accident => f64::INFINITY,
        }
    }

    pub fn is_blocking(self) -> bool {
        self == TrafficLevel::Accident
    }

    /// Parses the level names used by import documents (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vazio" | "empty" | "livre" => Some(TrafficLevel::Empty),
            "normal" => Some(TrafficLevel::Normal),
            "elevado" | "heavy" => Some(TrafficLevel::Heavy),
            "muito_elevado" | "very_heavy" | "veryheavy" => Some(TrafficLevel::VeryHeavy),
            "acidente" | "accident" => Some(TrafficLevel::Accident),
            _ => None,
        }
    }
}

/// Stored edge. Traffic lives in a slot shared by directional copies.
#[derive(Debug, Clone)]
struct EdgeRecord {
    from: NodeId,
    to: NodeId,
    distance_km: f64,
    speed_kmh: f64,
    name: String,
    slot: usize,
}

/// Read-only view of one directed edge with its current traffic level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge<'g> {
    pub from: NodeId,
    pub to: NodeId,
    pub distance_km: f64,
    pub speed_kmh: f64,
    pub name: &'g str,
    pub traffic: TrafficLevel,
}

impl Edge<'_> {
    /// Traversal time in hours, `INFINITY` when the edge is blocked.
    pub fn travel_time_hours(&self) -> f64 {
        if self.traffic.is_blocking() {
            return f64::INFINITY;
        }
        self.distance_km / self.speed_kmh * self.traffic.multiplier()
    }

    /// Travel time at the given level, ignoring the current one.
    pub fn travel_time_hours_at(&self, level: TrafficLevel) -> f64 {
        Edge {
            traffic: level,
            ..*self
        }
        .travel_time_hours()
    }
}

#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub name: String,
    pub kind: NodeKind,
    pub position: Option<(f64, f64)>,
    pub attractiveness: f64,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: NodeKind::Location,
            position: None,
            attractiveness: 0.0,
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Some((x, y));
        self
    }

    pub fn with_attractiveness(mut self, attractiveness: f64) -> Self {
        self.attractiveness = attractiveness;
        self
    }
}

#[derive(Debug, Clone)]
pub struct EdgeSpec {
    pub distance_km: f64,
    pub speed_kmh: f64,
    pub name: String,
    pub traffic: TrafficLevel,
}

impl EdgeSpec {
    pub fn new(name: impl Into<String>, distance_km: f64, speed_kmh: f64) -> Self {
        Self {
            distance_km,
            speed_kmh,
            name: name.into(),
            traffic: TrafficLevel::Normal,
        }
    }

    pub fn with_traffic(mut self, traffic: TrafficLevel) -> Self {
        self.traffic = traffic;
        self
    }
}

#[derive(Debug, Clone, Default, Resource)]
pub struct CityGraph {
    directed: bool,
    nodes: Vec<Node>,
    by_name: HashMap<String, NodeId>,
    edges: Vec<EdgeRecord>,
    /// Outgoing edge indices per node, in insertion order.
    outgoing: Vec<Vec<usize>>,
    /// Incoming edge indices per node. Only maintained for directed graphs.
    incoming: Vec<Vec<usize>>,
    lookup: HashMap<(NodeId, NodeId), usize>,
    traffic: Vec<TrafficLevel>,
    slots: HashMap<String, usize>,
    traffic_version: u64,
}

impl CityGraph {
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            ..Default::default()
        }
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of stored directed edges (undirected edges count twice).
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Adds a node, assigning the next sequential id.
    pub fn add_node(&mut self, spec: NodeSpec) -> Result<NodeId, LoadError> {
        if self.by_name.contains_key(&spec.name) {
            return Err(LoadError::DuplicateNode(spec.name));
        }
        if !(spec.attractiveness >= 0.0) {
            return Err(LoadError::InvalidField {
                entity: "node",
                id: spec.name,
                field: "attractiveness",
                expected: "non-negative",
                value: spec.attractiveness,
            });
        }
        let id = NodeId(self.nodes.len() as u32);
        self.by_name.insert(spec.name.clone(), id);
        self.nodes.push(Node {
            id,
            name: spec.name,
            kind: spec.kind,
            position: spec.position,
            attractiveness: spec.attractiveness,
        });
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        Ok(id)
    }

    /// Adds an edge between two existing nodes. Undirected graphs get both directions.
    pub fn add_edge(&mut self, from: &str, to: &str, spec: EdgeSpec) -> Result<(), LoadError> {
        for (field, value) in [("distance", spec.distance_km), ("speed", spec.speed_kmh)] {
            if !(value > 0.0) || !value.is_finite() {
                return Err(LoadError::InvalidField {
                    entity: "edge",
                    id: spec.name.clone(),
                    field,
                    expected: "a positive number",
                    value,
                });
            }
        }
        let from_id = self.require(from, &spec.name)?;
        let to_id = self.require(to, &spec.name)?;

        let slot = match self.slots.get(&spec.name) {
            Some(slot) => *slot,
            None => {
                let slot = self.traffic.len();
                self.traffic.push(spec.traffic);
                self.slots.insert(spec.name.clone(), slot);
                slot
            }
        };

        self.push_edge(from_id, to_id, &spec, slot);
        if !self.directed && from_id != to_id {
            self.push_edge(to_id, from_id, &spec, slot);
        }
        Ok(())
    }

    fn require(&self, name: &str, edge: &str) -> Result<NodeId, LoadError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| LoadError::UnknownNode {
                edge: edge.to_string(),
                node: name.to_string(),
            })
    }

    fn push_edge(&mut self, from: NodeId, to: NodeId, spec: &EdgeSpec, slot: usize) {
        let index = self.edges.len();
        self.edges.push(EdgeRecord {
            from,
            to,
            distance_km: spec.distance_km,
            speed_kmh: spec.speed_kmh,
            name: spec.name.clone(),
            slot,
        });
        self.outgoing[from.index()].push(index);
        if self.directed {
            self.incoming[to.index()].push(index);
        }
        self.lookup.insert((from, to), index);
    }

    fn view(&self, index: usize) -> Edge<'_> {
        let record = &self.edges[index];
        Edge {
            from: record.from,
            to: record.to,
            distance_km: record.distance_km,
            speed_kmh: record.speed_kmh,
            name: &record.name,
            traffic: self.traffic[record.slot],
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.by_name.get(name).map(|id| &self.nodes[id.index()])
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].name
    }

    /// Outgoing neighbours in insertion order.
    pub fn neighbours(&self, id: NodeId) -> impl Iterator<Item = (NodeId, Edge<'_>)> + '_ {
        self.outgoing
            .get(id.index())
            .into_iter()
            .flatten()
            .map(move |&index| {
                let edge = self.view(index);
                (edge.to, edge)
            })
    }

    /// Nodes with an edge into `id`. Undirected graphs reuse forward adjacency.
    pub fn predecessors(&self, id: NodeId) -> Box<dyn Iterator<Item = (NodeId, Edge<'_>)> + '_> {
        if !self.directed {
            return Box::new(self.neighbours(id));
        }
        Box::new(
            self.incoming
                .get(id.index())
                .into_iter()
                .flatten()
                .map(move |&index| {
                    let edge = self.view(index);
                    (edge.from, edge)
                }),
        )
    }

    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<Edge<'_>> {
        self.lookup.get(&(from, to)).map(|&index| self.view(index))
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<Edge<'_>> {
        self.edge_between(self.id_of(from)?, self.id_of(to)?)
    }

    /// First stored edge carrying `name`.
    pub fn edge_by_name(&self, name: &str) -> Option<Edge<'_>> {
        self.edges
            .iter()
            .position(|record| record.name == name)
            .map(|index| self.view(index))
    }

    /// Every directional copy carrying `name`.
    pub fn edges_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Edge<'a>> + 'a {
        self.edges
            .iter()
            .enumerate()
            .filter(move |(_, record)| record.name == name)
            .map(move |(index, _)| self.view(index))
    }

    pub fn traffic_level(&self, name: &str) -> Option<TrafficLevel> {
        self.slots.get(name).map(|slot| self.traffic[*slot])
    }

    /// Updates the traffic level on every copy of the named edge.
    /// Returns `false` when no edge has that name.
    pub fn set_traffic_level(&mut self, name: &str, level: TrafficLevel) -> bool {
        let Some(slot) = self.slots.get(name).copied() else {
            return false;
        };
        if self.traffic[slot] != level {
            self.traffic[slot] = level;
            self.traffic_version += 1;
        }
        true
    }

    /// Bumped on every effective traffic change; used to invalidate cached routes.
    pub fn traffic_version(&self) -> u64 {
        self.traffic_version
    }

    /// Consecutive edges along `route`. Pairs without an edge are skipped with a warning.
    pub fn route_edges<'a>(&'a self, route: &'a [String]) -> impl Iterator<Item = Edge<'a>> + 'a {
        route.windows(2).filter_map(move |pair| {
            let edge = self.edge(&pair[0], &pair[1]);
            if edge.is_none() {
                log::warn!("no edge between '{}' and '{}'", pair[0], pair[1]);
            }
            edge
        })
    }

    pub fn route_distance(&self, route: &[String]) -> f64 {
        self.route_edges(route).map(|edge| edge.distance_km).sum()
    }

    /// Total traversal time in hours; `INFINITY` if any segment is blocked.
    pub fn route_time(&self, route: &[String]) -> f64 {
        let mut total = 0.0;
        for edge in self.route_edges(route) {
            let time = edge.travel_time_hours();
            if time.is_infinite() {
                return f64::INFINITY;
            }
            total += time;
        }
        total
    }

    /// True if consecutive nodes of `route` are all joined by edges.
    pub fn is_connected_route(&self, route: &[String]) -> bool {
        route
            .windows(2)
            .all(|pair| self.edge(&pair[0], &pair[1]).is_some())
    }

    pub fn stations_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(move |node| node.kind == kind)
    }

    pub fn names(&self, ids: &[NodeId]) -> Route {
        ids.iter().map(|id| self.name_of(*id).to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle(directed: bool) -> CityGraph {
        let mut graph = CityGraph::new(directed);
        for name in ["A", "B", "C"] {
            graph.add_node(NodeSpec::new(name)).expect("node");
        }
        graph
            .add_edge("A", "B", EdgeSpec::new("AB", 10.0, 50.0))
            .expect("edge");
        graph
            .add_edge("B", "C", EdgeSpec::new("BC", 20.0, 40.0))
            .expect("edge");
        graph
    }

    fn route(names: &[&str]) -> Route {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn traffic_levels_order_edge_time() {
        let graph = triangle(false);
        let edge = graph.edge("A", "B").expect("edge");
        let times: Vec<f64> = [
            TrafficLevel::Empty,
            TrafficLevel::Normal,
            TrafficLevel::Heavy,
            TrafficLevel::VeryHeavy,
            TrafficLevel::Accident,
        ]
        .into_iter()
        .map(|level| edge.travel_time_hours_at(level))
        .collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert!(times[4].is_infinite());
    }

    #[test]
    fn undirected_copies_share_traffic_state() {
        let mut graph = triangle(false);
        assert!(graph.set_traffic_level("AB", TrafficLevel::Heavy));
        assert_eq!(graph.edge("A", "B").unwrap().traffic, TrafficLevel::Heavy);
        assert_eq!(graph.edge("B", "A").unwrap().traffic, TrafficLevel::Heavy);
        assert_eq!(graph.edges_named("AB").count(), 2);
    }

    #[test]
    fn named_edge_outlives_the_lookup_key() {
        let graph = triangle(false);
        let edge = {
            let key = String::from("BC");
            graph.edge_by_name(&key)
        };
        let edge = edge.expect("BC exists");
        assert_eq!(edge.name, "BC");
        assert_eq!(edge.distance_km, 20.0);
        assert!(graph.edge_by_name("ZZ").is_none());
    }

    #[test]
    fn unknown_edge_name_is_rejected() {
        let mut graph = triangle(true);
        assert!(!graph.set_traffic_level("ZZ", TrafficLevel::Accident));
        assert_eq!(graph.traffic_version(), 0);
    }

    #[test]
    fn accident_then_restore_gives_identical_time() {
        let mut graph = triangle(false);
        let path = route(&["A", "B", "C"]);
        let before = graph.route_time(&path);
        graph.set_traffic_level("BC", TrafficLevel::Accident);
        assert!(graph.route_time(&path).is_infinite());
        graph.set_traffic_level("BC", TrafficLevel::Normal);
        assert_eq!(graph.route_time(&path), before);
    }

    #[test]
    fn short_routes_accumulate_nothing() {
        let graph = triangle(false);
        assert_eq!(graph.route_distance(&[]), 0.0);
        assert_eq!(graph.route_distance(&route(&["A"])), 0.0);
        assert_eq!(graph.route_time(&route(&["A"])), 0.0);
        assert_eq!(graph.route_distance(&route(&["A", "B", "C"])), 30.0);
    }

    #[test]
    fn directed_graph_keeps_reverse_index() {
        let graph = triangle(true);
        let c = graph.id_of("C").unwrap();
        let preds: Vec<&str> = graph
            .predecessors(c)
            .map(|(id, _)| graph.name_of(id))
            .collect();
        assert_eq!(preds, vec!["B"]);
        assert!(graph.edge("B", "A").is_none());
    }

    #[test]
    fn rejects_duplicate_names_and_bad_distances() {
        let mut graph = triangle(true);
        assert!(matches!(
            graph.add_node(NodeSpec::new("A")),
            Err(LoadError::DuplicateNode(_))
        ));
        assert!(graph
            .add_edge("A", "C", EdgeSpec::new("AC", 0.0, 50.0))
            .is_err());
        assert!(graph
            .add_edge("A", "Z", EdgeSpec::new("AZ", 1.0, 50.0))
            .is_err());
    }

    #[test]
    fn parses_import_level_names() {
        assert_eq!(TrafficLevel::parse("ACIDENTE"), Some(TrafficLevel::Accident));
        assert_eq!(TrafficLevel::parse("elevado"), Some(TrafficLevel::Heavy));
        assert_eq!(TrafficLevel::parse("sideways"), None);
    }
}
