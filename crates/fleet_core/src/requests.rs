//! Transport requests and their lifecycle.

use std::collections::BTreeMap;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::fleet::VehicleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestState {
    #[default]
    Pending,
    InProgress,
    Completed,
    Rejected,
    /// Withdrawn before allocation.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub origin: String,
    pub destination: String,
    pub passengers: u32,
    /// Desired pickup time, simulation ms.
    pub desired_at: u64,
    pub priority: i32,
    pub eco_preference: bool,
    pub ride_sharing: bool,
    pub state: RequestState,
    /// Set exactly while the request is InProgress or Completed.
    pub assigned_vehicle: Option<VehicleId>,
}

impl Request {
    pub fn new(
        id: u64,
        origin: impl Into<String>,
        destination: impl Into<String>,
        passengers: u32,
    ) -> Self {
        Self {
            id: RequestId(id),
            origin: origin.into(),
            destination: destination.into(),
            passengers,
            desired_at: 0,
            priority: 0,
            eco_preference: false,
            ride_sharing: false,
            state: RequestState::Pending,
            assigned_vehicle: None,
        }
    }

    pub fn at(mut self, desired_at_ms: u64) -> Self {
        self.desired_at = desired_at_ms;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn eco(mut self) -> Self {
        self.eco_preference = true;
        self
    }

    pub fn shared(mut self) -> Self {
        self.ride_sharing = true;
        self
    }

    pub fn assign(&mut self, vehicle: VehicleId) {
        self.state = RequestState::InProgress;
        self.assigned_vehicle = Some(vehicle);
    }
}

#[derive(Debug, Default, Resource)]
pub struct RequestBook {
    requests: BTreeMap<RequestId, Request>,
}

impl RequestBook {
    /// Inserts a request; returns `false` if the id is taken.
    pub fn insert(&mut self, request: Request) -> bool {
        if self.requests.contains_key(&request.id) {
            return false;
        }
        self.requests.insert(request.id, request);
        true
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(&id)
    }

    pub fn get_mut(&mut self, id: RequestId) -> Option<&mut Request> {
        self.requests.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Request> {
        self.requests.values()
    }

    pub fn pending(&self) -> impl Iterator<Item = &Request> {
        self.requests
            .values()
            .filter(|r| r.state == RequestState::Pending)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn next_id(&self) -> RequestId {
        RequestId(self.requests.keys().next_back().map_or(1, |id| id.0 + 1))
    }

    /// Cancels a request that has not been allocated yet.
    pub fn withdraw(&mut self, id: RequestId) -> bool {
        match self.requests.get_mut(&id) {
            Some(request) if request.state == RequestState::Pending => {
                request.state = RequestState::Cancelled;
                true
            }
            _ => false,
        }
    }

    pub fn complete(&mut self, id: RequestId) {
        if let Some(request) = self.requests.get_mut(&id) {
            request.state = RequestState::Completed;
        }
    }

    pub fn reject(&mut self, id: RequestId) {
        if let Some(request) = self.requests.get_mut(&id) {
            request.state = RequestState::Rejected;
            request.assigned_vehicle = None;
        }
    }
}
