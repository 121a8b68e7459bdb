//! The mapping SDK seam.
//!
//! The session controller never talks to a concrete maps provider. It is
//! handed an [`SdkLoader`], which bootstraps an [`MapsSdk`], which in turn
//! creates [`MapWidget`] instances and answers directions/geocoding queries.

pub mod headless;
pub mod http;
pub mod scripted;

use crate::error::{GeocodeError, LoadError, RouteError};
use crate::geo::{LatLng, LatLngBounds};
use crate::route::{Directions, RouteRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use headless::HeadlessMap;
pub use http::{HttpLoader, HttpMapsSdk};
pub use scripted::{ScriptedLoader, ScriptedSdk};

/// Bootstrap options passed to the loader alongside the API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderOptions {
    /// SDK release channel.
    pub version: String,
    /// Optional SDK libraries to load.
    pub libraries: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            version: "weekly".to_string(),
            libraries: vec!["places".to_string()],
        }
    }
}

/// Construction options for a map widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOptions {
    pub center: LatLng,
    pub zoom: i32,
    /// Viewport restriction, if any.
    pub restriction: Option<LatLngBounds>,
    pub strict_bounds: bool,
    /// Hide zoom/pan/street-view/fullscreen controls.
    pub disable_default_ui: bool,
}

impl MapOptions {
    pub fn new(center: LatLng, zoom: i32) -> Self {
        Self {
            center,
            zoom,
            restriction: None,
            strict_bounds: false,
            disable_default_ui: true,
        }
    }
}

/// Visual style of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerStyle {
    /// Default pin.
    Pin,
    /// Blue dot used for the device location.
    CurrentLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerOptions {
    pub position: LatLng,
    pub style: MarkerStyle,
    /// Animate the marker dropping onto the map.
    pub drop_animation: bool,
}

impl MarkerOptions {
    pub fn pin(position: LatLng) -> Self {
        Self {
            position,
            style: MarkerStyle::Pin,
            drop_animation: true,
        }
    }

    pub fn current_location(position: LatLng) -> Self {
        Self {
            position,
            style: MarkerStyle::CurrentLocation,
            drop_animation: true,
        }
    }
}

/// Opaque reference to a marker owned by a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerHandle(pub u64);

/// Bootstraps the SDK. Called at most once per [`crate::bootstrap::InitGuard`]
/// cycle.
#[async_trait]
pub trait SdkLoader: Send + Sync {
    async fn load(&self, api_key: &str, options: &LoaderOptions) -> Result<Arc<dyn MapsSdk>, LoadError>;
}

/// A loaded SDK: widget factory plus the directions and geocoding services.
#[async_trait]
pub trait MapsSdk: Send + Sync {
    /// Construct a new interactive map.
    fn create_map(&self, options: MapOptions) -> Arc<dyn MapWidget>;

    /// Run a directions query. A non-OK status is returned as data, not as an error.
    async fn route(&self, request: &RouteRequest) -> Result<Directions, RouteError>;

    /// Resolve an address to a position.
    async fn geocode(&self, address: &str) -> Result<LatLng, GeocodeError>;
}

/// An interactive map instance. Handles are shared, so every method takes
/// `&self`.
pub trait MapWidget: Send + Sync {
    fn center(&self) -> LatLng;
    fn set_center(&self, center: LatLng);

    fn zoom(&self) -> i32;
    /// Set the zoom level; the widget clamps to the range it supports.
    fn set_zoom(&self, zoom: i32);

    fn add_marker(&self, marker: MarkerOptions) -> MarkerHandle;
    fn remove_marker(&self, handle: MarkerHandle) -> bool;
    fn markers(&self) -> Vec<(MarkerHandle, MarkerOptions)>;

    /// Replace the rendered route overlay; `None` clears it.
    fn set_directions(&self, directions: Option<Directions>);
    fn directions(&self) -> Option<Directions>;
}
