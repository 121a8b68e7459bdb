//! Geographic primitives shared by the SDK seam and the session controller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Center of the hero map on first render.
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 30.3753,
    lng: 69.3451,
};

/// Zoom level of the hero map on first render.
pub const DEFAULT_ZOOM: i32 = 6;

/// Zoom applied after a successful place search.
pub const SEARCH_ZOOM: i32 = 10;

/// Zoom applied when showing the device location.
pub const DEVICE_LOCATION_ZOOM: i32 = 12;

/// Viewport restriction for the hero map (Pakistan).
pub const PAKISTAN_BOUNDS: LatLngBounds = LatLngBounds {
    south_west: LatLng {
        lat: 23.69,
        lng: 60.87,
    },
    north_east: LatLng {
        lat: 37.09,
        lng: 77.84,
    },
};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance in kilometres.
    pub fn haversine_km(&self, other: &LatLng) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for LatLng {
    type Err = String;

    /// Parses `"lat,lng"`, rejecting values outside the valid ranges.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("expected \"lat,lng\", got {s:?}"))?;
        let lat: f64 = lat.trim().parse().map_err(|_| format!("invalid latitude in {s:?}"))?;
        let lng: f64 = lng.trim().parse().map_err(|_| format!("invalid longitude in {s:?}"))?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(format!("coordinate out of range: {s:?}"));
        }
        Ok(Self { lat, lng })
    }
}

/// Axis-aligned coordinate box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn contains(&self, point: &LatLng) -> bool {
        (self.south_west.lat..=self.north_east.lat).contains(&point.lat)
            && (self.south_west.lng..=self.north_east.lng).contains(&point.lng)
    }
}

/// A route endpoint: either explicit coordinates or a free-form place name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Place {
    Coords(LatLng),
    Name(String),
}

impl Place {
    /// Interpret user input: `"lat,lng"` becomes coordinates, anything else a name.
    pub fn parse(input: &str) -> Self {
        match input.parse::<LatLng>() {
            Ok(coords) => Place::Coords(coords),
            Err(_) => Place::Name(input.trim().to_string()),
        }
    }

    /// Query-string form understood by the directions service.
    pub fn as_query(&self) -> String {
        match self {
            Place::Coords(c) => c.to_string(),
            Place::Name(name) => name.clone(),
        }
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_query())
    }
}

impl From<LatLng> for Place {
    fn from(c: LatLng) -> Self {
        Place::Coords(c)
    }
}

impl From<&str> for Place {
    fn from(name: &str) -> Self {
        Place::Name(name.to_string())
    }
}
