use bevy_ecs::prelude::{Res, ResMut};

use crate::clock::{EventKind, EventSubject, SimulationClock, ONE_MIN_MS};
use crate::config::SimulationConfig;
use crate::policies::RepositioningPolicy;
use crate::requests::{RequestBook, RequestState};
use crate::systems::traffic::TrafficTimeline;

/// Seeds the clock: one arrival per pending request, one event per traffic change, and
/// the first repositioning run and tick when those features are on.
pub fn simulation_started_system(
    mut clock: ResMut<SimulationClock>,
    config: Res<SimulationConfig>,
    requests: Res<RequestBook>,
    timeline: Res<TrafficTimeline>,
    repositioning: Res<RepositioningPolicy>,
) {
    let mut arrivals = 0;
    for request in requests.iter().filter(|r| r.state == RequestState::Pending) {
        clock.schedule_with_priority(
            request.desired_at,
            EventKind::RequestArrival,
            request.priority,
            Some(EventSubject::Request(request.id)),
        );
        arrivals += 1;
    }
    for (index, change) in timeline.iter().enumerate() {
        clock.schedule_at(change.at, EventKind::TrafficChange, Some(EventSubject::Traffic(index)));
    }
    if let Some(params) = repositioning.params() {
        clock.schedule_at(
            params.interval_minutes.max(1) * ONE_MIN_MS,
            EventKind::RepositionRun,
            None,
        );
    }
    if config.dynamics.enabled {
        clock.schedule_at(config.tick_interval_ms.max(1), EventKind::Tick, None);
    }
    log::info!(
        "simulation started: {} requests, {} traffic changes, {} h horizon",
        arrivals,
        timeline.len(),
        config.duration_hours
    );
}
