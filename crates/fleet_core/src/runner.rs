//! Simulation runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule.

use bevy_ecs::prelude::Res;
use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::{CurrentEvent, Event, EventKind, SimulationClock};
use crate::scenario::SimulationEndTimeMs;
use crate::systems::{
    dynamics::dynamic_conditions_system,
    pickup::client_pickup_system,
    progress::trip_progress_system,
    recharge::{
        need_recharge_system, recharge_end_system, recharge_start_system, station_arrival_system,
    },
    repositioning::repositioning_system,
    request_arrival::request_arrival_system,
    start::simulation_started_system,
    telemetry_snapshot::capture_snapshot_system,
    traffic::traffic_change_system,
    trip_completed::trip_completed_system,
};
use crate::telemetry::{SimSnapshotConfig, SimSnapshots};

// Condition functions for each event kind
fn is_simulation_started(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::SimulationStarted)
        .unwrap_or(false)
}

fn is_request_arrival(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RequestArrival)
        .unwrap_or(false)
}

fn is_client_pickup(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::ClientPickup)
        .unwrap_or(false)
}

fn is_trip_completed(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::TripCompleted)
        .unwrap_or(false)
}

fn is_station_arrival(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::StationArrival)
        .unwrap_or(false)
}

fn is_need_recharge(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::NeedRecharge)
        .unwrap_or(false)
}

fn is_recharge_start(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RechargeStart)
        .unwrap_or(false)
}

fn is_recharge_end(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RechargeEnd)
        .unwrap_or(false)
}

fn is_traffic_change(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::TrafficChange)
        .unwrap_or(false)
}

fn is_reposition_run(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::RepositionRun)
        .unwrap_or(false)
}

fn is_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event.map(|e| e.0.kind == EventKind::Tick).unwrap_or(false)
}

/// Condition: telemetry snapshot interval has elapsed.
fn should_capture_snapshot(
    clock: Option<Res<SimulationClock>>,
    config: Option<Res<SimSnapshotConfig>>,
    snapshots: Option<Res<SimSnapshots>>,
) -> bool {
    let Some(clock) = clock else {
        return false;
    };
    let Some(config) = config else {
        return false;
    };
    let Some(snapshots) = snapshots else {
        return false;
    };

    let now = clock.now();
    match snapshots.last_snapshot_at {
        None => true,
        Some(last) => now.saturating_sub(last) >= config.interval_ms,
    }
}

/// Pops the next event unless the clock is empty or the event lies at or past
/// [SimulationEndTimeMs] (when that resource is present).
fn pop_next_event(world: &mut World) -> Option<Event> {
    let stop_at = world.get_resource::<SimulationEndTimeMs>().map(|e| e.0);
    let next_ts = world
        .get_resource::<SimulationClock>()
        .and_then(|c| c.next_event_time());
    if let (Some(end_ms), Some(ts)) = (stop_at, next_ts) {
        if ts >= end_ms {
            return None;
        }
    }
    world.get_resource_mut::<SimulationClock>()?.pop_next()
}

/// Runs one simulation step: pops the next event, inserts it as [CurrentEvent], then runs the schedule.
/// Returns `true` if an event was processed, `false` if the clock was empty or if the next event
/// is at or past [SimulationEndTimeMs].
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let Some(event) = pop_next_event(world) else {
        return false;
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Runs one simulation step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let Some(event) = pop_next_event(world) else {
        return false;
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    hook(world, &event);
    true
}

/// Runs simulation steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Runs simulation steps until empty and invokes `hook` after each step.
pub fn run_until_empty_with_hook<F>(
    world: &mut World,
    schedule: &mut Schedule,
    max_steps: usize,
    mut hook: F,
) -> usize
where
    F: FnMut(&World, &Event),
{
    let mut steps = 0;
    while steps < max_steps && run_next_event_with_hook(world, schedule, &mut hook) {
        steps += 1;
    }
    steps
}

/// Builds the simulation schedule.
///
/// Trip progress runs first on every event so handlers see live positions; exactly one
/// handler then reacts to the event kind. Everything is chained, so a run is a pure
/// function of the world and the event sequence.
pub fn simulation_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.add_systems(
        (
            trip_progress_system,
            simulation_started_system.run_if(is_simulation_started),
            request_arrival_system.run_if(is_request_arrival),
            client_pickup_system.run_if(is_client_pickup),
            trip_completed_system.run_if(is_trip_completed),
            station_arrival_system.run_if(is_station_arrival),
            need_recharge_system.run_if(is_need_recharge),
            recharge_start_system.run_if(is_recharge_start),
            recharge_end_system.run_if(is_recharge_end),
            traffic_change_system.run_if(is_traffic_change),
            repositioning_system.run_if(is_reposition_run),
            dynamic_conditions_system.run_if(is_tick),
            capture_snapshot_system.run_if(should_capture_snapshot),
        )
            .chain(),
    );

    schedule
}

/// Initializes the simulation by scheduling the SimulationStarted event at time 0.
/// Call this after building the scenario and before running events.
pub fn initialize_simulation(world: &mut World) {
    let mut clock = world.resource_mut::<SimulationClock>();
    clock.schedule_at(0, EventKind::SimulationStarted, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{EventKind, ONE_HOUR_MS};
    use crate::requests::{Request, RequestBook};
    use crate::test_helpers::chain_world;

    #[test]
    fn stops_at_end_time() {
        let mut world = chain_world();
        world.insert_resource(SimulationEndTimeMs(ONE_HOUR_MS));
        {
            let mut clock = world.resource_mut::<SimulationClock>();
            clock.schedule_at(ONE_HOUR_MS - 1, EventKind::RepositionRun, None);
            clock.schedule_at(ONE_HOUR_MS, EventKind::RepositionRun, None);
        }
        let mut schedule = simulation_schedule();
        assert_eq!(run_until_empty(&mut world, &mut schedule, 10), 1);
        assert_eq!(world.resource::<SimulationClock>().now(), ONE_HOUR_MS - 1);
        assert_eq!(world.resource::<SimulationClock>().len(), 1);
    }

    #[test]
    fn hook_sees_every_processed_event() {
        let mut world = chain_world();
        world
            .resource_mut::<RequestBook>()
            .insert(Request::new(1, "A", "B", 1).at(1_000));
        initialize_simulation(&mut world);

        let mut schedule = simulation_schedule();
        let mut kinds = Vec::new();
        let steps = run_until_empty_with_hook(&mut world, &mut schedule, 100, |_, event| {
            kinds.push(event.kind);
        });

        assert_eq!(steps, kinds.len());
        assert_eq!(kinds[0], EventKind::SimulationStarted);
        assert_eq!(kinds[1], EventKind::RequestArrival);
        assert_eq!(kinds.last(), Some(&EventKind::TripCompleted));
    }
}
