pub mod fleet;
pub mod graph;
pub mod schedule;
pub mod world;
