//! Offline SDK with scripted answers.
//!
//! Used by the CLI `--offline` mode and throughout the test suite. Every
//! service call is counted so callers can assert on exactly what reached the
//! "network".

use super::{HeadlessMap, LoaderOptions, MapOptions, MapWidget, MapsSdk, SdkLoader};
use crate::error::{GeocodeError, LoadError, RouteError};
use crate::geo::{LatLng, Place};
use crate::route::{Directions, DirectionsStatus, RouteRequest, TextValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Road distance is longer than the great-circle distance.
const ROAD_FACTOR: f64 = 1.25;
/// Average driving speed used for estimated routes.
const AVERAGE_SPEED_KMH: f64 = 60.0;

/// Built-in gazetteer for offline use.
const CITIES: &[(&str, f64, f64)] = &[
    ("islamabad", 33.6844, 73.0479),
    ("lahore", 31.5204, 74.3587),
    ("karachi", 24.8607, 67.0011),
    ("peshawar", 34.0151, 71.5249),
    ("quetta", 30.1798, 66.9750),
    ("multan", 30.1575, 71.5249),
    ("faisalabad", 31.4504, 73.1350),
    ("skardu", 35.2971, 75.6333),
    ("gilgit", 35.9208, 74.3144),
    ("hunza", 36.3167, 74.6500),
    ("murree", 33.9070, 73.3943),
    ("swat", 35.2227, 72.4258),
];

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn key(place: &Place) -> String {
    normalize(&place.as_query())
}

fn pair(origin: &str, destination: &str) -> (String, String) {
    (normalize(origin), normalize(destination))
}

/// Format a distance the way the directions service does.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{} m", (km * 1000.0).round() as u64)
    } else {
        format!("{} km", km.round() as u64)
    }
}

/// Format a duration the way the directions service does.
pub fn format_duration(minutes: u64) -> String {
    let unit = |n: u64, one: &str, many: &str| format!("{n} {}", if n == 1 { one } else { many });
    let (hours, mins) = (minutes / 60, minutes % 60);
    match (hours, mins) {
        (0, m) => unit(m.max(1), "min", "mins"),
        (h, 0) => unit(h, "hour", "hours"),
        (h, m) => format!("{} {}", unit(h, "hour", "hours"), unit(m, "min", "mins")),
    }
}

/// Scripted implementation of [`MapsSdk`].
#[derive(Default)]
pub struct ScriptedSdk {
    routes: Mutex<HashMap<(String, String), Directions>>,
    route_delays: Mutex<HashMap<(String, String), Duration>>,
    places: Mutex<HashMap<String, LatLng>>,
    estimate_routes: bool,
    maps: Mutex<Vec<Arc<HeadlessMap>>>,
    route_calls: AtomicUsize,
    geocode_calls: AtomicUsize,
}

impl ScriptedSdk {
    pub fn new() -> Self {
        Self::default()
    }

    /// An SDK that knows the built-in gazetteer and estimates driving
    /// routes between any two known places.
    pub fn with_gazetteer() -> Self {
        let sdk = Self {
            estimate_routes: true,
            ..Self::default()
        };
        for &(name, lat, lng) in CITIES {
            sdk.insert_place(name, LatLng::new(lat, lng));
        }
        sdk
    }

    pub fn insert_place(&self, name: &str, position: LatLng) {
        lock(&self.places).insert(normalize(name), position);
    }

    /// Script the answer for `origin -> destination`.
    pub fn insert_route(&self, origin: &str, destination: &str, directions: Directions) {
        lock(&self.routes).insert(pair(origin, destination), directions);
    }

    /// Delay the answer for `origin -> destination`.
    pub fn insert_route_delay(&self, origin: &str, destination: &str, delay: Duration) {
        lock(&self.route_delays).insert(pair(origin, destination), delay);
    }

    pub fn route_calls(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    pub fn geocode_calls(&self) -> usize {
        self.geocode_calls.load(Ordering::SeqCst)
    }

    /// Widgets created so far, oldest first.
    pub fn maps(&self) -> Vec<Arc<HeadlessMap>> {
        lock(&self.maps).clone()
    }

    fn resolve(&self, place: &Place) -> Option<LatLng> {
        match place {
            Place::Coords(c) => Some(*c),
            Place::Name(_) => lock(&self.places).get(&key(place)).copied(),
        }
    }

    fn estimate(&self, request: &RouteRequest) -> Directions {
        let (Some(from), Some(to)) = (self.resolve(&request.origin), self.resolve(&request.destination)) else {
            return Directions::failed(DirectionsStatus::NotFound);
        };
        let km = from.haversine_km(&to) * ROAD_FACTOR;
        let minutes = (km / AVERAGE_SPEED_KMH * 60.0).round() as u64;
        Directions::single_leg(
            TextValue::new(format_distance(km), (km * 1000.0).round() as u64),
            TextValue::new(format_duration(minutes), minutes * 60),
        )
    }
}

#[async_trait]
impl MapsSdk for ScriptedSdk {
    fn create_map(&self, options: MapOptions) -> Arc<dyn MapWidget> {
        let map = Arc::new(HeadlessMap::new(options));
        lock(&self.maps).push(Arc::clone(&map));
        map
    }

    async fn route(&self, request: &RouteRequest) -> Result<Directions, RouteError> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        let pair = (key(&request.origin), key(&request.destination));
        let delay = lock(&self.route_delays).get(&pair).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = lock(&self.routes).get(&pair).cloned();
        Ok(match scripted {
            Some(directions) => directions,
            None if self.estimate_routes => self.estimate(request),
            None => Directions::failed(DirectionsStatus::ZeroResults),
        })
    }

    async fn geocode(&self, address: &str) -> Result<LatLng, GeocodeError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        self.resolve(&Place::parse(address))
            .ok_or_else(|| GeocodeError::NoResults(address.to_string()))
    }
}

/// Loader handing out a shared [`ScriptedSdk`].
pub struct ScriptedLoader {
    sdk: Arc<ScriptedSdk>,
    delay: Option<Duration>,
    failure: Mutex<Option<LoadError>>,
    calls: AtomicUsize,
}

impl ScriptedLoader {
    pub fn new(sdk: Arc<ScriptedSdk>) -> Self {
        Self {
            sdk,
            delay: None,
            failure: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every load take `delay` before completing.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail subsequent loads with `error`; `None` restores success.
    pub fn set_failure(&self, error: Option<LoadError>) {
        *lock(&self.failure) = error;
    }

    /// Number of times `load` has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sdk(&self) -> &Arc<ScriptedSdk> {
        &self.sdk
    }
}

#[async_trait]
impl SdkLoader for ScriptedLoader {
    async fn load(&self, _api_key: &str, _options: &LoaderOptions) -> Result<Arc<dyn MapsSdk>, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failure = lock(&self.failure).clone();
        match failure {
            Some(error) => Err(error),
            None => Ok(Arc::clone(&self.sdk) as Arc<dyn MapsSdk>),
        }
    }
}
