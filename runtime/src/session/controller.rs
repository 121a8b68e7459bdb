// Copyright 2026 The Travelers Contributors
// SPDX-License-Identifier: Apache-2.0

//! Map session controller — owns one map instance from mount to unmount.

use super::binder::{RouteOverlayBinder, StaleRoutePolicy};
use super::planner::{RouteCallback, RouteFailurePolicy, RoutePlanner};
use crate::bootstrap::{BootstrapRequest, InitGuard, ReadinessWait, TeardownSignal};
use crate::error::{LoadError, RouteError, SessionError};
use crate::geo::{LatLng, LatLngBounds, Place, DEVICE_LOCATION_ZOOM, PAKISTAN_BOUNDS, SEARCH_ZOOM};
use crate::journal::Journal;
use crate::route::RouteResult;
use crate::sdk::{LoaderOptions, MapOptions, MapWidget, MapsSdk, MarkerHandle, MarkerOptions, SdkLoader};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Callback receiving the map handle once initialization succeeds.
pub type LoadCallback = Box<dyn FnOnce(Arc<dyn MapWidget>) + Send>;

/// Settings a controller needs from configuration.
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub api_key: String,
    pub loader: LoaderOptions,
    pub readiness: ReadinessWait,
    pub restriction: Option<LatLngBounds>,
    pub route_failure: RouteFailurePolicy,
    pub stale_routes: StaleRoutePolicy,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            loader: LoaderOptions::default(),
            readiness: ReadinessWait::Notify,
            restriction: Some(PAKISTAN_BOUNDS),
            route_failure: RouteFailurePolicy::Silent,
            stale_routes: StaleRoutePolicy::Complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Not initialized yet, or waiting for the SDK.
    Loading,
    Ready,
    /// Initialization failed; the message is the user-facing retry prompt.
    Failed(String),
    Unmounted,
}

/// A live map: viewport, widget handle and the markers this session dropped.
pub struct MapSession {
    pub id: String,
    pub center: LatLng,
    pub zoom: i32,
    map: Arc<dyn MapWidget>,
    markers: Vec<MarkerHandle>,
}

impl MapSession {
    pub fn map(&self) -> &Arc<dyn MapWidget> {
        &self.map
    }

    /// Markers in the order they were placed.
    pub fn markers(&self) -> &[MarkerHandle] {
        &self.markers
    }

    fn sync_viewport(&mut self) {
        self.center = self.map.center();
        self.zoom = self.map.zoom();
    }
}

pub struct MapSessionController {
    guard: Arc<InitGuard>,
    loader: Arc<dyn SdkLoader>,
    options: ControllerOptions,
    on_load: Option<LoadCallback>,
    on_route_calculated: Option<RouteCallback>,
    journal: Option<Journal>,
    teardown: TeardownSignal,
    status: SessionStatus,
    sdk: Option<Arc<dyn MapsSdk>>,
    session: Option<MapSession>,
    planner: Option<RoutePlanner>,
}

impl MapSessionController {
    pub fn new(guard: Arc<InitGuard>, loader: Arc<dyn SdkLoader>, options: ControllerOptions) -> Self {
        Self {
            guard,
            loader,
            options,
            on_load: None,
            on_route_calculated: None,
            journal: None,
            teardown: TeardownSignal::new(),
            status: SessionStatus::Loading,
            sdk: None,
            session: None,
            planner: None,
        }
    }

    /// Invoked exactly once, after the first successful `initialize`.
    pub fn on_load(mut self, callback: impl FnOnce(Arc<dyn MapWidget>) + Send + 'static) -> Self {
        self.on_load = Some(Box::new(callback));
        self
    }

    /// Invoked once per successfully computed route with `(distance, time)`.
    pub fn on_route_calculated(mut self, callback: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_route_calculated = Some(Arc::new(callback));
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Handle that unmounts this controller's view from another task, e.g.
    /// while `initialize` is still waiting for the SDK.
    pub fn teardown_signal(&self) -> TeardownSignal {
        self.teardown.clone()
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn session(&self) -> Option<&MapSession> {
        self.session.as_ref()
    }

    /// Bring up the map, bootstrapping the SDK through the shared guard.
    ///
    /// Calling again on a ready controller returns the existing session.
    pub async fn initialize(&mut self, center: LatLng, zoom: i32) -> Result<&MapSession, LoadError> {
        if self.teardown.is_triggered() {
            return Err(LoadError::Unmounted);
        }
        if self.session.is_none() {
            self.bring_up(center, zoom).await?;
        }
        self.session.as_ref().ok_or(LoadError::Unmounted)
    }

    async fn bring_up(&mut self, center: LatLng, zoom: i32) -> Result<(), LoadError> {
        self.status = SessionStatus::Loading;
        let started = Instant::now();
        let request = BootstrapRequest {
            loader: Arc::clone(&self.loader),
            api_key: self.options.api_key.clone(),
            options: self.options.loader.clone(),
        };

        let sdk = match self
            .guard
            .acquire(request, self.options.readiness, &self.teardown)
            .await
        {
            Ok(sdk) => sdk,
            Err(LoadError::Unmounted) => {
                self.status = SessionStatus::Unmounted;
                return Err(LoadError::Unmounted);
            }
            Err(e) => {
                self.status = SessionStatus::Failed(e.user_message().to_string());
                self.record(None, "load", None, started, &e.to_string());
                return Err(e);
            }
        };

        // Unmounted between readiness and now: touch nothing.
        if self.teardown.is_triggered() {
            self.status = SessionStatus::Unmounted;
            return Err(LoadError::Unmounted);
        }

        let map = sdk.create_map(MapOptions {
            center,
            zoom,
            restriction: self.options.restriction,
            strict_bounds: false,
            disable_default_ui: true,
        });
        let id = uuid::Uuid::new_v4().to_string();

        let planner = RoutePlanner::new(
            Arc::clone(&sdk),
            Arc::clone(&map),
            self.on_route_calculated.clone(),
            self.options.route_failure,
        )
        .with_journal(self.journal.clone(), &id);

        let default_marker = map.add_marker(MarkerOptions::pin(center));

        if let Some(callback) = self.on_load.take() {
            callback(Arc::clone(&map));
        }

        info!("map session {id} ready at {center} zoom {zoom}");
        self.record(Some(&id), "load", None, started, "ok");

        let mut session = MapSession {
            id,
            center,
            zoom,
            map,
            markers: vec![default_marker],
        };
        session.sync_viewport();

        self.status = SessionStatus::Ready;
        self.sdk = Some(sdk);
        self.planner = Some(planner);
        self.session = Some(session);
        Ok(())
    }

    fn session_mut(&mut self) -> Result<&mut MapSession, SessionError> {
        match (&self.status, self.session.as_mut()) {
            (SessionStatus::Unmounted, _) => Err(SessionError::Unmounted),
            (_, Some(session)) => Ok(session),
            (_, None) => Err(SessionError::NotInitialized),
        }
    }

    /// Change zoom by `delta`; the widget clamps to its supported range.
    /// Returns the resulting zoom.
    pub fn set_zoom(&mut self, delta: i32) -> Result<i32, SessionError> {
        let session = self.session_mut()?;
        let current = session.map.zoom();
        session.map.set_zoom(current.saturating_add(delta));
        session.sync_viewport();
        debug!("zoom {current} -> {}", session.zoom);
        Ok(session.zoom)
    }

    /// Re-center on `position` and drop a pin there.
    pub fn recenter_and_mark(&mut self, position: LatLng) -> Result<MarkerHandle, SessionError> {
        self.place_marker(MarkerOptions::pin(position), None)
    }

    /// Re-center on the device location at street-level zoom and mark it.
    pub fn show_device_location(&mut self, position: LatLng) -> Result<MarkerHandle, SessionError> {
        self.place_marker(
            MarkerOptions::current_location(position),
            Some(DEVICE_LOCATION_ZOOM),
        )
    }

    fn place_marker(&mut self, marker: MarkerOptions, zoom: Option<i32>) -> Result<MarkerHandle, SessionError> {
        let session = self.session_mut()?;
        session.map.set_center(marker.position);
        if let Some(zoom) = zoom {
            session.map.set_zoom(zoom);
        }
        let handle = session.map.add_marker(marker);
        session.markers.push(handle);
        session.sync_viewport();
        Ok(handle)
    }

    /// Geocode `query`, then re-center at city zoom and drop a pin.
    ///
    /// A blank query does nothing. A failed lookup leaves the map untouched.
    pub async fn search(&mut self, query: &str) -> Result<Option<LatLng>, SessionError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }
        self.session_mut()?;
        let sdk = self.sdk.clone().ok_or(SessionError::NotInitialized)?;

        let started = Instant::now();
        let position = match sdk.geocode(query).await {
            Ok(position) => position,
            Err(e) => {
                warn!("search for {query:?} failed: {e}");
                let id = self.session.as_ref().map(|s| s.id.clone());
                self.record(id.as_deref(), "search", Some(query), started, &e.to_string());
                return Err(e.into());
            }
        };

        self.place_marker(MarkerOptions::pin(position), Some(SEARCH_ZOOM))?;
        let id = self.session.as_ref().map(|s| s.id.clone());
        self.record(id.as_deref(), "search", Some(query), started, "ok");
        Ok(Some(position))
    }

    /// Compute and render the driving route between two optional endpoints.
    ///
    /// See [`RoutePlanner::compute_route`] for the clearing and failure rules.
    pub async fn compute_route(
        &self,
        origin: Option<&Place>,
        destination: Option<&Place>,
    ) -> Result<Option<RouteResult>, RouteError> {
        match (&self.status, &self.planner) {
            (SessionStatus::Ready, Some(planner)) => planner.compute_route(origin, destination).await,
            _ => Err(RouteError::NotReady),
        }
    }

    /// Start a binder that re-routes whenever endpoints change. It stops on
    /// unmount.
    pub fn bind_routes(&self) -> Result<RouteOverlayBinder, SessionError> {
        match (&self.status, &self.planner) {
            (SessionStatus::Unmounted, _) => Err(SessionError::Unmounted),
            (_, Some(planner)) => Ok(RouteOverlayBinder::spawn(
                planner.clone(),
                self.options.stale_routes,
                self.teardown.clone(),
            )),
            (_, None) => Err(SessionError::NotInitialized),
        }
    }

    /// Tear down the view: stop pending waits and binders, drop the session.
    pub fn unmount(&mut self) {
        self.teardown.trigger();
        if let Some(session) = self.session.take() {
            info!("map session {} unmounted", session.id);
        }
        self.planner = None;
        self.sdk = None;
        self.status = SessionStatus::Unmounted;
    }

    fn record(&self, session_id: Option<&str>, event: &str, detail: Option<&str>, started: Instant, status: &str) {
        if let Some(journal) = &self.journal {
            journal.record(
                session_id,
                event,
                detail,
                started.elapsed().as_millis() as u64,
                status,
            );
        }
    }
}

impl Drop for MapSessionController {
    fn drop(&mut self) {
        self.teardown.trigger();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::guard::DEFAULT_POLL_INTERVAL_MS;
    use crate::geo::DEFAULT_CENTER;
    use crate::route::{Directions, DirectionsStatus, TextValue};
    use crate::sdk::{MarkerStyle, ScriptedLoader, ScriptedSdk};
    use crate::session::planner::RouteUpdate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn loader(delay_ms: u64) -> Arc<ScriptedLoader> {
        let sdk = Arc::new(ScriptedSdk::with_gazetteer());
        sdk.insert_route(
            "CityA",
            "CityB",
            Directions::single_leg(TextValue::new("10 km", 10_000), TextValue::new("15 mins", 900)),
        );
        sdk.insert_route("CityA", "CityC", Directions::failed(DirectionsStatus::ZeroResults));
        Arc::new(ScriptedLoader::new(sdk).with_delay(Duration::from_millis(delay_ms)))
    }

    fn controller(guard: &Arc<InitGuard>, loader: &Arc<ScriptedLoader>, options: ControllerOptions) -> MapSessionController {
        MapSessionController::new(
            Arc::clone(guard),
            Arc::clone(loader) as Arc<dyn SdkLoader>,
            options,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_initialize_places_default_marker_and_calls_on_load_once() {
        let guard = InitGuard::shared();
        let loader = loader(20);
        let loads = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&loads);

        let mut c = controller(&guard, &loader, ControllerOptions::default())
            .on_load(move |_map| {
                seen.fetch_add(1, Ordering::SeqCst);
            });

        let session = c.initialize(DEFAULT_CENTER, 6).await.unwrap();
        assert_eq!(session.markers().len(), 1);
        assert_eq!(session.zoom, 6);
        let markers = session.map().markers();
        assert_eq!(markers[0].1.position, DEFAULT_CENTER);

        c.initialize(DEFAULT_CENTER, 6).await.unwrap();
        assert_eq!(c.status(), &SessionStatus::Ready);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(loader.calls(), 1);
        assert_eq!(loader.sdk().maps().len(), 1);
        assert_eq!(loader.sdk().maps()[0].restriction(), Some(PAKISTAN_BOUNDS));
        assert!(loader.sdk().maps()[0].default_ui_disabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_controllers_share_one_bootstrap() {
        let guard = InitGuard::shared();
        let loader = loader(300);

        for readiness in [
            ReadinessWait::Notify,
            ReadinessWait::Poll {
                interval_ms: DEFAULT_POLL_INTERVAL_MS,
            },
        ] {
            let options = ControllerOptions {
                readiness,
                ..ControllerOptions::default()
            };
            let mut a = controller(&guard, &loader, options.clone());
            let mut b = controller(&guard, &loader, options.clone());
            let mut c = controller(&guard, &loader, options);
            let (ra, rb, rc) = tokio::join!(
                a.initialize(DEFAULT_CENTER, 6),
                b.initialize(DEFAULT_CENTER, 7),
                c.initialize(DEFAULT_CENTER, 8),
            );
            assert!(ra.is_ok() && rb.is_ok() && rc.is_ok());
        }
        assert_eq!(loader.calls(), 1);
        assert_eq!(loader.sdk().maps().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_failure_surfaces_retry_prompt() {
        let guard = InitGuard::shared();
        let loader = loader(10);
        loader.set_failure(Some(LoadError::Auth("bad key".into())));

        let mut c = controller(&guard, &loader, ControllerOptions::default());
        let err = c.initialize(DEFAULT_CENTER, 6).await.err();
        assert_eq!(err, Some(LoadError::Auth("bad key".into())));
        assert_eq!(
            c.status(),
            &SessionStatus::Failed("Failed to load the map. Please try again later.".into())
        );
        assert_eq!(c.set_zoom(1), Err(SessionError::NotInitialized));

        // Manual reload.
        loader.set_failure(None);
        assert!(guard.reset());
        c.initialize(DEFAULT_CENTER, 6).await.unwrap();
        assert_eq!(c.status(), &SessionStatus::Ready);
        assert_eq!(loader.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_while_polling_makes_no_widget_calls() {
        let guard = InitGuard::shared();
        let loader = loader(5_000);
        let options = ControllerOptions {
            readiness: ReadinessWait::Poll { interval_ms: 100 },
            ..ControllerOptions::default()
        };

        let mut c = controller(&guard, &loader, options);
        let teardown = c.teardown_signal();
        let unmount = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(350)).await;
            teardown.trigger();
        });

        assert_eq!(c.initialize(DEFAULT_CENTER, 6).await.err(), Some(LoadError::Unmounted));
        unmount.await.unwrap();
        assert_eq!(c.status(), &SessionStatus::Unmounted);
        let polls = guard.poll_count();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(guard.poll_count(), polls);
        assert!(loader.sdk().maps().is_empty());
        assert_eq!(c.initialize(DEFAULT_CENTER, 6).await.err(), Some(LoadError::Unmounted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zoom_round_trip() {
        let guard = InitGuard::shared();
        let loader = loader(0);
        let mut c = controller(&guard, &loader, ControllerOptions::default());
        c.initialize(DEFAULT_CENTER, 6).await.unwrap();

        assert_eq!(c.set_zoom(1), Ok(7));
        assert_eq!(c.set_zoom(-1), Ok(6));
        assert_eq!(c.session().unwrap().map().zoom(), 6);

        // Clamping belongs to the widget.
        assert_eq!(c.set_zoom(100), Ok(22));
        assert_eq!(c.set_zoom(i32::MAX), Ok(22));
        assert_eq!(c.set_zoom(i32::MIN), Ok(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recenter_search_and_device_location() {
        let guard = InitGuard::shared();
        let loader = loader(0);
        let mut c = controller(&guard, &loader, ControllerOptions::default());
        c.initialize(DEFAULT_CENTER, 6).await.unwrap();

        let skardu = LatLng::new(35.2971, 75.6333);
        c.recenter_and_mark(skardu).unwrap();
        assert_eq!(c.session().unwrap().center, skardu);
        assert_eq!(c.session().unwrap().zoom, 6);

        let lahore = c.search("Lahore").await.unwrap().unwrap();
        assert_eq!(lahore, LatLng::new(31.5204, 74.3587));
        assert_eq!(c.session().unwrap().zoom, SEARCH_ZOOM);

        let lookups = loader.sdk().geocode_calls();
        assert_eq!(c.search("   ").await, Ok(None));
        assert_eq!(loader.sdk().geocode_calls(), lookups);
        let before = c.session().unwrap().center;
        assert!(matches!(c.search("Atlantis").await, Err(SessionError::Geocode(_))));
        assert_eq!(c.session().unwrap().center, before);

        let here = LatLng::new(33.7, 73.05);
        c.show_device_location(here).unwrap();
        let session = c.session().unwrap();
        assert_eq!(session.zoom, DEVICE_LOCATION_ZOOM);
        assert_eq!(session.markers().len(), 4);
        let (_, last) = session.map().markers().pop().unwrap();
        assert_eq!(last.style, MarkerStyle::CurrentLocation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_compute_route_reports_and_respects_failure_policy() {
        let guard = InitGuard::shared();
        let loader = loader(0);
        let reported = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&reported);

        let mut c = controller(&guard, &loader, ControllerOptions::default())
            .on_route_calculated(move |d, t| sink.lock().unwrap().push((d.to_string(), t.to_string())));

        let a = Place::from("CityA");
        assert_eq!(
            c.compute_route(Some(&a), Some(&Place::from("CityB"))).await,
            Err(RouteError::NotReady)
        );

        c.initialize(DEFAULT_CENTER, 6).await.unwrap();
        let result = c
            .compute_route(Some(&a), Some(&Place::from("CityB")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.distance_text, "10 km");
        assert_eq!(result.time_text, "15 mins");

        let overlay = c.session().unwrap().map().directions();
        assert_eq!(c.compute_route(Some(&a), Some(&Place::from("CityC"))).await, Ok(None));
        assert_eq!(c.session().unwrap().map().directions(), overlay);
        assert_eq!(
            *reported.lock().unwrap(),
            vec![("10 km".to_string(), "15 mins".to_string())]
        );

        assert_eq!(c.compute_route(Some(&a), None).await, Ok(None));
        assert!(c.session().unwrap().map().directions().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_propagate_policy_returns_route_error() {
        let guard = InitGuard::shared();
        let loader = loader(0);
        let options = ControllerOptions {
            route_failure: RouteFailurePolicy::Propagate,
            ..ControllerOptions::default()
        };
        let mut c = controller(&guard, &loader, options);
        c.initialize(DEFAULT_CENTER, 6).await.unwrap();

        let result = c
            .compute_route(Some(&Place::from("CityA")), Some(&Place::from("CityC")))
            .await;
        assert_eq!(result, Err(RouteError::Status(DirectionsStatus::ZeroResults)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_journal_records_session_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal.jsonl");
        let guard = InitGuard::shared();
        let loader = loader(0);

        let mut c = controller(&guard, &loader, ControllerOptions::default())
            .with_journal(Journal::open(&path).unwrap());
        let id = c.initialize(DEFAULT_CENTER, 6).await.unwrap().id.clone();

        let a = Place::from("CityA");
        c.compute_route(Some(&a), Some(&Place::from("CityB"))).await.unwrap();
        c.compute_route(Some(&a), Some(&Place::from("CityC"))).await.unwrap();
        c.search("Lahore").await.unwrap();
        assert!(c.search("Atlantis").await.is_err());
        c.unmount();

        let lines: Vec<serde_json::Value> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let events: Vec<(&str, &str)> = lines
            .iter()
            .map(|l| (l["event"].as_str().unwrap(), l["status"].as_str().unwrap()))
            .collect();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], ("load", "ok"));
        assert_eq!(events[1], ("route", "ok"));
        assert_eq!(events[2].0, "route");
        assert!(events[2].1.contains("ZERO_RESULTS"), "got {}", events[2].1);
        assert_eq!(events[3], ("search", "ok"));
        assert_eq!(events[4].0, "search");
        assert_ne!(events[4].1, "ok");

        assert_eq!(lines[1]["detail"], "CityA -> CityB");
        assert_eq!(lines[3]["detail"], "Lahore");
        assert!(lines.iter().all(|l| l["session_id"] == id.as_str()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_binder_follows_controller_lifecycle() {
        let guard = InitGuard::shared();
        let loader = loader(0);
        let mut c = controller(&guard, &loader, ControllerOptions::default());
        assert!(matches!(c.bind_routes(), Err(SessionError::NotInitialized)));
        c.initialize(DEFAULT_CENTER, 6).await.unwrap();

        let binder = c.bind_routes().unwrap();
        binder.set_origin(Some(Place::from("CityA")));
        binder.set_destination(Some(Place::from("CityB")));
        let update = binder.settled().await.unwrap();
        assert!(matches!(update, RouteUpdate::Rendered(ref r) if r.time_text == "15 mins"));

        c.unmount();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!binder.is_running());
        assert_eq!(c.set_zoom(1), Err(SessionError::Unmounted));
        assert!(c.session().is_none());
    }
}
