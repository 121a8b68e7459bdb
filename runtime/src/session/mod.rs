//! Map sessions — controller, route planner and the overlay binder.

pub mod binder;
pub mod controller;
pub mod planner;

pub use binder::{RouteEndpoints, RouteOverlayBinder, StaleRoutePolicy};
pub use controller::{ControllerOptions, LoadCallback, MapSession, MapSessionController, SessionStatus};
pub use planner::{RouteCallback, RouteFailurePolicy, RoutePlanner, RouteUpdate};
