//! Route overlay binder — recompute the route whenever the endpoints change.
//!
//! Endpoints live in a watch channel. Writing an identical value is not a
//! change, and bursts of writes coalesce into the latest value before the
//! binder looks at them.

use super::planner::{RoutePlanner, RouteUpdate};
use crate::bootstrap::TeardownSignal;
use crate::geo::Place;
use crate::route::RouteRequest;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// What happens to an in-flight query when the endpoints change under it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaleRoutePolicy {
    /// Let it finish and render, then query the latest endpoints.
    #[default]
    Complete,
    /// Abandon it; its answer is never rendered or reported.
    Supersede,
}

/// Current origin/destination pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteEndpoints {
    pub origin: Option<Place>,
    pub destination: Option<Place>,
}

impl RouteEndpoints {
    pub fn new(origin: Option<Place>, destination: Option<Place>) -> Self {
        Self {
            origin,
            destination,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct Tracked {
    generation: u64,
    endpoints: RouteEndpoints,
}

/// Last endpoints generation the binder finished with, and its effect.
#[derive(Debug, Clone)]
struct Settled {
    generation: u64,
    update: RouteUpdate,
}

/// Handle to a running binder task. Dropping it stops the task.
pub struct RouteOverlayBinder {
    inputs: watch::Sender<Tracked>,
    settled: watch::Receiver<Option<Settled>>,
    task: JoinHandle<()>,
}

impl RouteOverlayBinder {
    /// Start binding `planner` to a fresh, empty endpoint pair.
    ///
    /// The task ends when `teardown` fires or the handle is dropped.
    pub fn spawn(planner: RoutePlanner, policy: StaleRoutePolicy, teardown: TeardownSignal) -> Self {
        let (inputs, rx) = watch::channel(Tracked::default());
        let (settled_tx, settled) = watch::channel(None);
        let task = tokio::spawn(run(planner, policy, rx, settled_tx, teardown));
        Self {
            inputs,
            settled,
            task,
        }
    }

    /// Replace both endpoints. Returns whether this was a change.
    pub fn set_endpoints(&self, endpoints: RouteEndpoints) -> bool {
        self.update(|current| *current = endpoints)
    }

    pub fn set_origin(&self, origin: Option<Place>) -> bool {
        self.update(|current| current.origin = origin)
    }

    pub fn set_destination(&self, destination: Option<Place>) -> bool {
        self.update(|current| current.destination = destination)
    }

    /// Apply `edit` under the channel's write lock; bumps the generation only
    /// when the endpoints actually change.
    fn update(&self, edit: impl FnOnce(&mut RouteEndpoints)) -> bool {
        self.inputs.send_if_modified(|tracked| {
            let mut next = tracked.endpoints.clone();
            edit(&mut next);
            if next == tracked.endpoints {
                return false;
            }
            tracked.endpoints = next;
            tracked.generation += 1;
            true
        })
    }

    pub fn endpoints(&self) -> RouteEndpoints {
        self.inputs.borrow().endpoints.clone()
    }

    /// Wait until the binder has caught up with the latest endpoints and
    /// return the effect of that last computation.
    ///
    /// Returns `None` if the binder stopped first.
    pub async fn settled(&self) -> Option<RouteUpdate> {
        let target = self.inputs.borrow().generation;
        let mut rx = self.settled.clone();
        let settled = rx
            .wait_for(|s| matches!(s, Some(s) if s.generation >= target))
            .await
            .ok()?;
        match &*settled {
            Some(s) => Some(s.update.clone()),
            None => None,
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the binder task.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for RouteOverlayBinder {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    planner: RoutePlanner,
    policy: StaleRoutePolicy,
    mut inputs: watch::Receiver<Tracked>,
    settled: watch::Sender<Option<Settled>>,
    teardown: TeardownSignal,
) {
    let publish = |generation: u64, update: RouteUpdate| {
        settled.send_replace(Some(Settled { generation, update }));
    };

    loop {
        let Tracked {
            generation,
            endpoints,
        } = inputs.borrow_and_update().clone();

        let mut superseded = false;
        match (endpoints.origin, endpoints.destination) {
            (Some(origin), Some(destination)) => {
                let request = RouteRequest::driving(origin, destination);
                let started = Instant::now();
                debug!("binder querying route for generation {generation}");

                match policy {
                    StaleRoutePolicy::Complete => {
                        let outcome = tokio::select! {
                            biased;
                            _ = teardown.cancelled() => return,
                            outcome = planner.fetch(&request) => outcome,
                        };
                        publish(generation, planner.settle(&request, outcome, started));
                    }
                    StaleRoutePolicy::Supersede => {
                        tokio::select! {
                            biased;
                            _ = teardown.cancelled() => return,
                            changed = inputs.changed() => {
                                if changed.is_err() {
                                    return;
                                }
                                debug!("route generation {generation} superseded");
                                publish(generation, RouteUpdate::Superseded);
                                superseded = true;
                            }
                            outcome = planner.fetch(&request) => {
                                publish(generation, planner.settle(&request, outcome, started));
                            }
                        }
                    }
                }
            }
            _ => {
                planner.clear();
                publish(generation, RouteUpdate::Cleared);
            }
        }

        if superseded {
            continue;
        }

        tokio::select! {
            biased;
            _ = teardown.cancelled() => return,
            changed = inputs.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}
