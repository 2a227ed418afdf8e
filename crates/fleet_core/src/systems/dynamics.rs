//! Weather and spontaneous demand, sampled on every tick.

use bevy_ecs::prelude::{Res, ResMut, Resource};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::config::{DynamicConditions, SimulationConfig};
use crate::graph::CityGraph;
use crate::requests::{Request, RequestBook};

#[derive(Resource)]
pub struct DynamicsState {
    rng: StdRng,
    pub raining: bool,
    pub request_probability: f64,
}

impl DynamicsState {
    pub fn new(conditions: &DynamicConditions) -> Self {
        Self {
            rng: StdRng::seed_from_u64(conditions.seed),
            raining: false,
            request_probability: conditions.random_request_probability,
        }
    }

    /// Flips the weather with probability `chance`. Rain doubles the request rate,
    /// clearing halves it again.
    fn maybe_toggle_weather(&mut self, chance: f64) -> bool {
        if !self.rng.gen_bool(chance.clamp(0.0, 1.0)) {
            return false;
        }
        self.raining = !self.raining;
        if self.raining {
            self.request_probability *= 2.0;
        } else {
            self.request_probability /= 2.0;
        }
        true
    }

    /// Origin weighted by attractiveness (uniform when no node has any), destination
    /// uniform among the other nodes.
    fn sample_pair(&mut self, graph: &CityGraph) -> Option<(String, String)> {
        let nodes = graph.nodes();
        if nodes.len() < 2 {
            return None;
        }
        let weights: Vec<f64> = nodes.iter().map(|n| n.attractiveness.max(0.0)).collect();
        let origin = match WeightedIndex::new(&weights) {
            Ok(index) => index.sample(&mut self.rng),
            Err(_) => self.rng.gen_range(0..nodes.len()),
        };
        let mut destination = self.rng.gen_range(0..nodes.len() - 1);
        if destination >= origin {
            destination += 1;
        }
        Some((nodes[origin].name.clone(), nodes[destination].name.clone()))
    }
}

/// Samples dynamic conditions and books the next tick.
pub fn dynamic_conditions_system(
    mut clock: ResMut<SimulationClock>,
    config: Res<SimulationConfig>,
    graph: Res<CityGraph>,
    mut state: ResMut<DynamicsState>,
    mut requests: ResMut<RequestBook>,
) {
    let now = clock.now();
    let conditions = config.dynamics;

    if conditions.enabled {
        if state.maybe_toggle_weather(conditions.weather_toggle_probability) {
            log::info!(
                "weather changed: {} (request chance {:.3})",
                if state.raining { "rain" } else { "dry" },
                state.request_probability
            );
        }
        let chance = state.request_probability.clamp(0.0, 1.0);
        if state.rng.gen_bool(chance) {
            if let Some((origin, destination)) = state.sample_pair(&graph) {
                let id = requests.next_id();
                let request = Request::new(id.0, origin, destination, 1).at(now);
                log::info!(
                    "random request {} from {} to {}",
                    id.0,
                    request.origin,
                    request.destination
                );
                let priority = request.priority;
                if requests.insert(request) {
                    clock.schedule_with_priority(
                        now,
                        EventKind::RequestArrival,
                        priority,
                        Some(EventSubject::Request(id)),
                    );
                }
            }
        }
    }

    let next = now + config.tick_interval_ms.max(1);
    if next < config.end_time_ms() {
        clock.schedule_at(next, EventKind::Tick, None);
    }
}
