#![allow(dead_code)]

use fleet_core::graph::{CityGraph, EdgeSpec, NodeKind, NodeSpec};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Node name of grid cell `(col, row)`.
pub fn cell(col: usize, row: usize) -> String {
    format!("n{col}_{row}")
}

/// A `cols` x `rows` undirected grid with integer edge lengths between 1 and 9 km, drawn
/// from `seed`, at 50 km/h. Coordinates are the grid positions, so straight-line
/// distance never exceeds the road distance.
pub fn random_grid(cols: usize, rows: usize, seed: u64) -> CityGraph {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut graph = CityGraph::new(false);
    for row in 0..rows {
        for col in 0..cols {
            graph
                .add_node(NodeSpec::new(cell(col, row)).at(col as f64, row as f64))
                .expect("unique cell");
        }
    }
    for row in 0..rows {
        for col in 0..cols {
            if col + 1 < cols {
                let km = rng.gen_range(1..10) as f64;
                graph
                    .add_edge(
                        &cell(col, row),
                        &cell(col + 1, row),
                        EdgeSpec::new(format!("h{col}_{row}"), km, 50.0),
                    )
                    .expect("grid edge");
            }
            if row + 1 < rows {
                let km = rng.gen_range(1..10) as f64;
                graph
                    .add_edge(
                        &cell(col, row),
                        &cell(col, row + 1),
                        EdgeSpec::new(format!("v{col}_{row}"), km, 50.0),
                    )
                    .expect("grid edge");
            }
        }
    }
    graph
}

/// A small town: `Depot - Mid - Market` on the main road (two 10 km stretches at
/// 60 km/h), a slower 15 km bypass `Depot - Ring - Market` at 30 km/h, a fuel station
/// 2 km off `Mid`, a charging station 1 km off `Market` and an unreachable `Island`.
/// `Market` is the attractive node.
pub fn town() -> CityGraph {
    let mut graph = CityGraph::new(false);
    let nodes = [
        NodeSpec::new("Depot").at(0.0, 0.0),
        NodeSpec::new("Mid").at(10.0, 0.0),
        NodeSpec::new("Market").at(20.0, 0.0).with_attractiveness(10.0),
        NodeSpec::new("Ring").at(10.0, 8.0),
        NodeSpec::new("Fuel").at(10.0, -2.0).with_kind(NodeKind::FuelStation),
        NodeSpec::new("Plug").at(21.0, 0.0).with_kind(NodeKind::ChargingStation),
        NodeSpec::new("Island"),
    ];
    for spec in nodes {
        graph.add_node(spec).expect("unique node");
    }
    let edges = [
        ("Depot", "Mid", "Main1", 10.0, 60.0),
        ("Mid", "Market", "Main2", 10.0, 60.0),
        ("Depot", "Ring", "Bypass1", 15.0, 30.0),
        ("Ring", "Market", "Bypass2", 15.0, 30.0),
        ("Mid", "Fuel", "FuelRd", 2.0, 60.0),
        ("Market", "Plug", "PlugRd", 1.0, 60.0),
    ];
    for (from, to, name, km, speed) in edges {
        graph
            .add_edge(from, to, EdgeSpec::new(name, km, speed))
            .expect("known nodes");
    }
    graph
}
