//! Error taxonomy for the map session runtime.
//!
//! `LoadError` covers the SDK bootstrap, `RouteError` the directions query,
//! `GeocodeError` the place search, and `SessionError` calls made against a
//! controller that has no ready session.

use crate::route::DirectionsStatus;

/// The mapping widget could not be brought up.
///
/// Cloneable so that one failed bootstrap can be handed to every caller
/// that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("no maps API key configured")]
    MissingApiKey,

    #[error("network error while loading the maps SDK: {0}")]
    Network(String),

    #[error("maps SDK rejected the API key: {0}")]
    Auth(String),

    #[error("view was unmounted before the map became ready")]
    Unmounted,

    #[error("maps SDK failed: {0}")]
    Sdk(String),
}

impl LoadError {
    /// Message shown to the end user alongside the retry action.
    pub fn user_message(&self) -> &'static str {
        "Failed to load the map. Please try again later."
    }
}

/// A directions query did not produce a route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("directions request failed: {0}")]
    Status(DirectionsStatus),

    #[error("directions transport error: {0}")]
    Transport(String),

    #[error("no map session is ready")]
    NotReady,
}

/// A place search did not resolve to a position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeocodeError {
    #[error("geocoding failed with status {0}")]
    Status(String),

    #[error("no results for {0:?}")]
    NoResults(String),

    #[error("geocoding transport error: {0}")]
    Transport(String),
}

/// Operation issued against a controller without a live session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("map session has not been initialized")]
    NotInitialized,

    #[error("map session was unmounted")]
    Unmounted,

    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

// Transport errors drop the request URL, which carries the API key.
impl From<reqwest::Error> for LoadError {
    fn from(err: reqwest::Error) -> Self {
        LoadError::Network(err.without_url().to_string())
    }
}

impl From<reqwest::Error> for RouteError {
    fn from(err: reqwest::Error) -> Self {
        RouteError::Transport(err.without_url().to_string())
    }
}

impl From<reqwest::Error> for GeocodeError {
    fn from(err: reqwest::Error) -> Self {
        GeocodeError::Transport(err.without_url().to_string())
    }
}
