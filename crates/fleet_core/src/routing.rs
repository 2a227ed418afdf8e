//! Pluggable routing strategies over the [CityGraph].
//!
//! Five implementations, selectable via [`RouterKind`]:
//!
//! - **`BreadthFirst`**: fewest hops, weights ignored.
//! - **`DepthFirst`**: first path found by recursive exploration.
//! - **`UniformCost`**: Dijkstra over the injected [`CostFunction`].
//! - **`AStar`**: uniform cost guided by an injected [`Heuristic`].
//! - **`Bidirectional`**: layered search from both ends; fewest hops only.
//!
//! Every strategy skips blocked (accident) edges, returns the single-node route when
//! origin equals destination, and returns `None` when no path exists. The strategy is
//! stored as a `Box<dyn RouteStrategy>` resource built from `RouterKind` at startup.

use std::cmp::Ordering;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use bevy_ecs::prelude::Resource;
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::cost::{CostFunction, Heuristic};
use crate::fleet::Vehicle;
use crate::graph::{CityGraph, NodeId, Route};

pub mod bidirectional;
pub mod uninformed;
pub mod weighted;

pub use bidirectional::Bidirectional;
pub use uninformed::{BreadthFirst, DepthFirst};
pub use weighted::{AStar, UniformCost};

/// Which search algorithm to use.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum RouterKind {
    BreadthFirst,
    DepthFirst,
    #[default]
    UniformCost,
    AStar,
    Bidirectional,
}

/// Routing backend contract. Implementations must be `Send + Sync` so the strategy
/// can live in a shared ECS resource.
pub trait RouteStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Node names from `origin` to `destination`, or `None` if unreachable.
    fn route(
        &self,
        graph: &CityGraph,
        origin: &str,
        destination: &str,
        vehicle: Option<&Vehicle>,
    ) -> Option<Route>;
}

/// ECS resource wrapping the configured strategy.
#[derive(Resource)]
pub struct Router(pub Box<dyn RouteStrategy>);

impl Router {
    pub fn new(strategy: Box<dyn RouteStrategy>) -> Self {
        Self(strategy)
    }
}

impl std::ops::Deref for Router {
    type Target = dyn RouteStrategy;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

/// Endpoints of a query after name resolution.
pub(crate) enum Endpoints {
    Trivial(Route),
    Search(NodeId, NodeId),
}

pub(crate) fn resolve(graph: &CityGraph, origin: &str, destination: &str) -> Option<Endpoints> {
    let from = graph.id_of(origin)?;
    let to = graph.id_of(destination)?;
    if from == to {
        return Some(Endpoints::Trivial(vec![origin.to_string()]));
    }
    Some(Endpoints::Search(from, to))
}

/// Walks `parents` back from `target` and returns the names in travel order.
pub(crate) fn reconstruct(graph: &CityGraph, parents: &[Option<NodeId>], target: NodeId) -> Route {
    let mut ids = vec![target];
    let mut current = target;
    while let Some(parent) = parents[current.index()] {
        ids.push(parent);
        current = parent;
    }
    ids.reverse();
    graph.names(&ids)
}

/// Priority-queue entry ordered so that `BinaryHeap` pops the lowest priority first,
/// then the lowest accumulated cost, then the earliest insertion.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frontier {
    pub priority: f64,
    pub cost: f64,
    pub seq: u64,
    pub node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .total_cmp(&self.priority)
            .then_with(|| other.cost.total_cmp(&self.cost))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

type CacheKey = (String, String, Option<bool>);

struct CacheState {
    traffic_version: u64,
    entries: LruCache<CacheKey, Option<Route>>,
}

/// LRU-cached wrapper around any [`RouteStrategy`].
///
/// Keyed by `(origin, destination, vehicle is electric)`. The whole cache is dropped
/// whenever the graph's traffic version moves, so cached routes never outlive the
/// traffic state they were computed under.
pub struct CachedRouter {
    inner: Box<dyn RouteStrategy>,
    cache: Mutex<CacheState>,
}

impl CachedRouter {
    pub fn new(inner: Box<dyn RouteStrategy>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(CacheState {
                traffic_version: 0,
                entries: LruCache::new(capacity),
            }),
        }
    }
}

impl RouteStrategy for CachedRouter {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn route(
        &self,
        graph: &CityGraph,
        origin: &str,
        destination: &str,
        vehicle: Option<&Vehicle>,
    ) -> Option<Route> {
        let key = (
            origin.to_string(),
            destination.to_string(),
            vehicle.map(|v| v.propulsion.is_electric()),
        );

        if let Ok(mut cache) = self.cache.lock() {
            if cache.traffic_version != graph.traffic_version() {
                cache.entries.clear();
                cache.traffic_version = graph.traffic_version();
            }
            if let Some(cached) = cache.entries.get(&key) {
                return cached.clone();
            }
        }

        let result = self.inner.route(graph, origin, destination, vehicle);

        if let Ok(mut cache) = self.cache.lock() {
            cache.entries.put(key, result.clone());
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Construct a boxed [`RouteStrategy`] from its descriptor.
///
/// A `capacity` of zero disables caching.
pub fn build_router(
    kind: RouterKind,
    cost: CostFunction,
    heuristic: Heuristic,
    cache_capacity: usize,
) -> Box<dyn RouteStrategy> {
    let inner: Box<dyn RouteStrategy> = match kind {
        RouterKind::BreadthFirst => Box::new(BreadthFirst),
        RouterKind::DepthFirst => Box::new(DepthFirst),
        RouterKind::UniformCost => Box::new(UniformCost::new(cost)),
        RouterKind::AStar => {
            if heuristic == Heuristic::Euclidean && !cost.admits_euclidean() {
                log::warn!(
                    "Euclidean heuristic is not a proven lower bound for {:?}; A* routes may be suboptimal",
                    cost
                );
            }
            Box::new(AStar::new(cost, heuristic))
        }
        RouterKind::Bidirectional => Box::new(Bidirectional),
    };
    if cache_capacity == 0 {
        inner
    } else {
        Box::new(CachedRouter::new(inner, cache_capacity))
    }
}
