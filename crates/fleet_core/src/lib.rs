pub mod allocation;
pub mod clock;
pub mod config;
pub mod cost;
pub mod error;
pub mod fleet;
pub mod graph;
pub mod import;
pub mod lifecycle;
pub mod metrics;
pub mod metrics_export;
pub mod policies;
pub mod requests;
pub mod routing;
pub mod runner;
pub mod scenario;
pub mod systems;
pub mod telemetry;
pub mod trip;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
