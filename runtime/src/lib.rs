//! Travelers Map — map session runtime.
//!
//! Brings up an interactive map behind a shared, once-only SDK bootstrap,
//! keeps its viewport and markers, and renders driving routes between two
//! places as they change.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod geo;
pub mod journal;
pub mod route;
pub mod sdk;
pub mod session;

pub use bootstrap::{InitGuard, ReadinessWait, TeardownSignal};
pub use config::MapConfig;
pub use error::{GeocodeError, LoadError, RouteError, SessionError};
pub use geo::{LatLng, LatLngBounds, Place};
pub use route::{RouteRequest, RouteResult};
pub use session::{
    ControllerOptions, MapSessionController, RouteFailurePolicy, RouteOverlayBinder, StaleRoutePolicy,
};
