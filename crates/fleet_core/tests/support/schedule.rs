#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use fleet_core::clock::EventKind;
use fleet_core::runner::{
    initialize_simulation, run_next_event, run_until_empty, run_until_empty_with_hook,
    simulation_schedule,
};

/// Helper that owns a reusable `Schedule` so tests can step or drain the event queue.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    /// Create a runner with the default simulation schedule.
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    /// Run a single event (returns `true` if an event was processed).
    pub fn run_one(&mut self, world: &mut World) -> bool {
        run_next_event(world, &mut self.schedule)
    }

    /// Run multiple events up to `max_steps`, returning the number of steps executed.
    pub fn run_until_empty(&mut self, world: &mut World, max_steps: usize) -> usize {
        run_until_empty(world, &mut self.schedule, max_steps)
    }

    /// Schedule the start event and drive the simulation to the end.
    pub fn run_full(&mut self, world: &mut World) -> usize {
        initialize_simulation(world);
        self.run_until_empty(world, 1_000_000)
    }

    /// Like [ScheduleRunner::run_full], returning the kind and time of every event processed.
    pub fn run_full_traced(&mut self, world: &mut World) -> Vec<(u64, EventKind)> {
        initialize_simulation(world);
        let mut trace = Vec::new();
        run_until_empty_with_hook(world, &mut self.schedule, 1_000_000, |_, event| {
            trace.push((event.timestamp, event.kind));
        });
        trace
    }
}
