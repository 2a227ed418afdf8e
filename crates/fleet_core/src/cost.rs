//! Edge cost functions and search heuristics.

use serde::{Deserialize, Serialize};

use crate::fleet::{Propulsion, Vehicle};
use crate::graph::{CityGraph, Edge, NodeId};

/// kg of CO2 emitted per km by a combustion vehicle.
pub const COMBUSTION_EMISSIONS_KG_PER_KM: f64 = 0.12;

pub fn emissions_kg(propulsion: &Propulsion, distance_km: f64) -> f64 {
    match propulsion {
        Propulsion::Combustion => distance_km * COMBUSTION_EMISSIONS_KG_PER_KM,
        Propulsion::Electric { .. } => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CostFunction {
    /// Edge length in km.
    #[default]
    Distance,
    /// Traversal time in hours including traffic; blocked edges cost `INFINITY`.
    TravelTime,
    /// Traversal time plus an emissions surcharge (hours per kg of CO2).
    Environmental { emissions_weight: f64 },
}

impl CostFunction {
    pub fn edge_cost(&self, edge: &Edge<'_>, vehicle: Option<&Vehicle>) -> f64 {
        match self {
            CostFunction::Distance => edge.distance_km,
            CostFunction::TravelTime => edge.travel_time_hours(),
            CostFunction::Environmental { emissions_weight } => {
                let time = edge.travel_time_hours();
                if time.is_infinite() {
                    return f64::INFINITY;
                }
                let emissions = vehicle
                    .map(|v| emissions_kg(&v.propulsion, edge.distance_km))
                    .unwrap_or(0.0);
                time + emissions_weight * emissions
            }
        }
    }

    /// Sum of edge costs along `route`, short-circuiting to `INFINITY`.
    pub fn route_cost(
        &self,
        graph: &CityGraph,
        route: &[String],
        vehicle: Option<&Vehicle>,
    ) -> f64 {
        let mut total = 0.0;
        for edge in graph.route_edges(route) {
            let cost = self.edge_cost(&edge, vehicle);
            if cost.is_infinite() {
                return f64::INFINITY;
            }
            total += cost;
        }
        total
    }

    /// Whether Euclidean distance is a proven lower bound for this cost.
    pub fn admits_euclidean(&self) -> bool {
        matches!(self, CostFunction::Distance)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Heuristic {
    #[default]
    Zero,
    /// Straight-line distance between node coordinates; zero when either is missing.
    Euclidean,
}

impl Heuristic {
    pub fn estimate(&self, graph: &CityGraph, from: NodeId, to: NodeId) -> f64 {
        match self {
            Heuristic::Zero => 0.0,
            Heuristic::Euclidean => {
                let from = graph.node(from).and_then(|n| n.position);
                let to = graph.node(to).and_then(|n| n.position);
                match (from, to) {
                    (Some((x1, y1)), Some((x2, y2))) => {
                        ((x2 - x1).powi(2) + (y2 - y1).powi(2)).sqrt()
                    }
                    _ => 0.0,
                }
            }
        }
    }

    pub fn estimate_by_name(&self, graph: &CityGraph, from: &str, to: &str) -> f64 {
        match (graph.id_of(from), graph.id_of(to)) {
            (Some(from), Some(to)) => self.estimate(graph, from, to),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeSpec, NodeSpec, TrafficLevel};

    fn pair() -> CityGraph {
        let mut graph = CityGraph::new(false);
        graph.add_node(NodeSpec::new("A").at(0.0, 0.0)).unwrap();
        graph.add_node(NodeSpec::new("B").at(3.0, 4.0)).unwrap();
        graph.add_node(NodeSpec::new("C").at(3.0, 10.0)).unwrap();
        graph.add_edge("A", "B", EdgeSpec::new("AB", 5.0, 50.0)).unwrap();
        graph.add_edge("B", "C", EdgeSpec::new("BC", 6.0, 60.0)).unwrap();
        graph
    }

    #[test]
    fn time_cost_is_monotonic_in_traffic() {
        let mut graph = pair();
        let mut costs = Vec::new();
        for level in [
            TrafficLevel::Empty,
            TrafficLevel::Normal,
            TrafficLevel::Heavy,
            TrafficLevel::VeryHeavy,
            TrafficLevel::Accident,
        ] {
            graph.set_traffic_level("AB", level);
            let edge = graph.edge("A", "B").unwrap();
            costs.push(CostFunction::TravelTime.edge_cost(&edge, None));
        }
        assert!(costs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(costs[4], f64::INFINITY);
    }

    #[test]
    fn route_cost_short_circuits_on_blocked_segment() {
        let mut graph = pair();
        let route: Vec<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
        assert_eq!(CostFunction::Distance.route_cost(&graph, &route, None), 11.0);
        let before = CostFunction::TravelTime.route_cost(&graph, &route, None);
        graph.set_traffic_level("BC", TrafficLevel::Accident);
        assert!(CostFunction::TravelTime.route_cost(&graph, &route, None).is_infinite());
        graph.set_traffic_level("BC", TrafficLevel::Normal);
        assert_eq!(CostFunction::TravelTime.route_cost(&graph, &route, None), before);
    }

    #[test]
    fn euclidean_uses_coordinates() {
        let graph = pair();
        let a = graph.id_of("A").unwrap();
        let b = graph.id_of("B").unwrap();
        assert_eq!(Heuristic::Euclidean.estimate(&graph, a, b), 5.0);
        assert_eq!(Heuristic::Zero.estimate(&graph, a, b), 0.0);
    }

    #[test]
    fn electric_vehicles_emit_nothing() {
        assert_eq!(emissions_kg(&Propulsion::Combustion, 10.0), 1.2);
        let electric = Propulsion::Electric {
            recharge_minutes_per_km: 2.0,
        };
        assert_eq!(emissions_kg(&electric, 10.0), 0.0);
    }
}
