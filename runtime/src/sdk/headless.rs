//! In-memory map widget used by the HTTP and scripted SDKs.
//!
//! Holds exactly what an interactive map would display: viewport, markers in
//! insertion order, and at most one route overlay.

use super::{MapOptions, MapWidget, MarkerHandle, MarkerOptions};
use crate::geo::{LatLng, LatLngBounds};
use crate::route::Directions;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lowest zoom level the widget accepts.
pub const MIN_ZOOM: i32 = 0;
/// Highest zoom level the widget accepts.
pub const MAX_ZOOM: i32 = 22;

struct MapState {
    center: LatLng,
    zoom: i32,
    markers: Vec<(MarkerHandle, MarkerOptions)>,
    directions: Option<Directions>,
}

/// Headless implementation of [`MapWidget`].
pub struct HeadlessMap {
    state: Mutex<MapState>,
    restriction: Option<LatLngBounds>,
    strict_bounds: bool,
    disable_default_ui: bool,
    next_marker: AtomicU64,
    overlay_updates: AtomicUsize,
}

impl HeadlessMap {
    pub fn new(options: MapOptions) -> Self {
        Self {
            state: Mutex::new(MapState {
                center: options.center,
                zoom: options.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
                markers: Vec::new(),
                directions: None,
            }),
            restriction: options.restriction,
            strict_bounds: options.strict_bounds,
            disable_default_ui: options.disable_default_ui,
            next_marker: AtomicU64::new(1),
            overlay_updates: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> MutexGuard<'_, MapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn restriction(&self) -> Option<LatLngBounds> {
        self.restriction
    }

    pub fn default_ui_disabled(&self) -> bool {
        self.disable_default_ui
    }

    /// Number of times the route overlay has been set or cleared.
    pub fn overlay_updates(&self) -> usize {
        self.overlay_updates.load(Ordering::SeqCst)
    }
}

impl MapWidget for HeadlessMap {
    fn center(&self) -> LatLng {
        self.state().center
    }

    fn set_center(&self, center: LatLng) {
        // Strict bounds pin the viewport inside the restriction.
        let center = match self.restriction {
            Some(bounds) if self.strict_bounds => LatLng::new(
                center.lat.clamp(bounds.south_west.lat, bounds.north_east.lat),
                center.lng.clamp(bounds.south_west.lng, bounds.north_east.lng),
            ),
            _ => center,
        };
        self.state().center = center;
    }

    fn zoom(&self) -> i32 {
        self.state().zoom
    }

    fn set_zoom(&self, zoom: i32) {
        self.state().zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn add_marker(&self, marker: MarkerOptions) -> MarkerHandle {
        let handle = MarkerHandle(self.next_marker.fetch_add(1, Ordering::SeqCst));
        self.state().markers.push((handle, marker));
        handle
    }

    fn remove_marker(&self, handle: MarkerHandle) -> bool {
        let mut state = self.state();
        let before = state.markers.len();
        state.markers.retain(|(h, _)| *h != handle);
        state.markers.len() != before
    }

    fn markers(&self) -> Vec<(MarkerHandle, MarkerOptions)> {
        self.state().markers.clone()
    }

    fn set_directions(&self, directions: Option<Directions>) {
        self.overlay_updates.fetch_add(1, Ordering::SeqCst);
        self.state().directions = directions;
    }

    fn directions(&self) -> Option<Directions> {
        self.state().directions.clone()
    }
}
