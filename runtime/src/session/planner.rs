//! Route planner — directions query plus overlay rendering for one map.
//!
//! A planner is the overlay layer attached to a map at initialization. It is
//! cheap to clone; the controller and the binder share one.

use crate::error::RouteError;
use crate::geo::Place;
use crate::journal::Journal;
use crate::route::{Directions, RouteRequest, RouteResult};
use crate::sdk::{MapWidget, MapsSdk};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Caller callback receiving `(distance_text, time_text)`.
pub type RouteCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// What `compute_route` returns when the directions query fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteFailurePolicy {
    /// Log the failure and report no result.
    #[default]
    Silent,
    /// Return the failure to the caller.
    Propagate,
}

/// Effect of one route computation on the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteUpdate {
    /// An endpoint was missing; the overlay was cleared.
    Cleared,
    /// The overlay now shows this route.
    Rendered(RouteResult),
    /// The query failed; the previous overlay is untouched.
    Failed(RouteError),
    /// Endpoints changed before the answer arrived; nothing was rendered.
    Superseded,
}

#[derive(Clone)]
pub struct RoutePlanner {
    sdk: Arc<dyn MapsSdk>,
    map: Arc<dyn MapWidget>,
    on_route_calculated: Option<RouteCallback>,
    failure_policy: RouteFailurePolicy,
    journal: Option<Journal>,
    session_id: String,
}

impl RoutePlanner {
    pub fn new(
        sdk: Arc<dyn MapsSdk>,
        map: Arc<dyn MapWidget>,
        on_route_calculated: Option<RouteCallback>,
        failure_policy: RouteFailurePolicy,
    ) -> Self {
        Self {
            sdk,
            map,
            on_route_calculated,
            failure_policy,
            journal: None,
            session_id: String::new(),
        }
    }

    pub(crate) fn with_journal(mut self, journal: Option<Journal>, session_id: &str) -> Self {
        self.journal = journal;
        self.session_id = session_id.to_string();
        self
    }

    /// Compute and render the route between two optional endpoints.
    ///
    /// A missing endpoint clears the overlay without querying. On a failed
    /// query the overlay is left as it was and the callback is not invoked;
    /// the return value then follows the [`RouteFailurePolicy`].
    pub async fn compute_route(
        &self,
        origin: Option<&Place>,
        destination: Option<&Place>,
    ) -> Result<Option<RouteResult>, RouteError> {
        let (Some(origin), Some(destination)) = (origin, destination) else {
            self.clear();
            return Ok(None);
        };

        let request = RouteRequest::driving(origin.clone(), destination.clone());
        let started = Instant::now();
        let outcome = self.fetch(&request).await;

        match self.settle(&request, outcome, started) {
            RouteUpdate::Rendered(result) => Ok(Some(result)),
            RouteUpdate::Failed(e) => match self.failure_policy {
                RouteFailurePolicy::Silent => Ok(None),
                RouteFailurePolicy::Propagate => Err(e),
            },
            RouteUpdate::Cleared | RouteUpdate::Superseded => Ok(None),
        }
    }

    /// Remove any rendered route.
    pub fn clear(&self) {
        debug!("clearing route overlay");
        self.map.set_directions(None);
    }

    /// Issue the directions query without touching the overlay.
    pub async fn fetch(&self, request: &RouteRequest) -> Result<Directions, RouteError> {
        let directions = self.sdk.route(request).await?;
        if directions.status.is_ok() {
            Ok(directions)
        } else {
            Err(RouteError::Status(directions.status))
        }
    }

    /// Apply a query outcome to the overlay and notify the caller.
    pub fn settle(
        &self,
        request: &RouteRequest,
        outcome: Result<Directions, RouteError>,
        started: Instant,
    ) -> RouteUpdate {
        let elapsed = started.elapsed().as_millis() as u64;
        let detail = format!("{} -> {}", request.origin, request.destination);

        match outcome {
            Ok(directions) => {
                let result = RouteResult::from_directions(&directions);
                self.map.set_directions(Some(directions));
                if let Some(callback) = &self.on_route_calculated {
                    callback(&result.distance_text, &result.time_text);
                }
                self.journal("route", &detail, elapsed, "ok");
                RouteUpdate::Rendered(result)
            }
            Err(e) => {
                warn!("directions request failed ({detail}): {e}");
                self.journal("route", &detail, elapsed, &e.to_string());
                RouteUpdate::Failed(e)
            }
        }
    }

    fn journal(&self, event: &str, detail: &str, elapsed: u64, status: &str) {
        if let Some(journal) = &self.journal {
            journal.record(Some(&self.session_id), event, Some(detail), elapsed, status);
        }
    }
}
