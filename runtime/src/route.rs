//! Directions request/response types.
//!
//! `Directions` mirrors the JSON answer of the directions web service closely
//! enough to deserialize it directly; everything the session needs is
//! reachable through `routes[0].legs[0]`.

use crate::geo::Place;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text reported when the service omits a distance or duration.
pub const UNKNOWN_TEXT: &str = "Unknown";

/// Travel mode of a directions query. Only driving is used by the hero map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelMode {
    #[default]
    Driving,
}

impl TravelMode {
    /// Lowercase form used in web-service query strings.
    pub fn as_query(&self) -> &'static str {
        match self {
            TravelMode::Driving => "driving",
        }
    }
}

/// A single directions query, built fresh for every endpoint change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub origin: Place,
    pub destination: Place,
    pub travel_mode: TravelMode,
}

impl RouteRequest {
    pub fn driving(origin: Place, destination: Place) -> Self {
        Self {
            origin,
            destination,
            travel_mode: TravelMode::Driving,
        }
    }
}

/// Status field of a directions answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectionsStatus {
    Ok,
    NotFound,
    ZeroResults,
    MaxWaypointsExceeded,
    MaxRouteLengthExceeded,
    InvalidRequest,
    OverQueryLimit,
    RequestDenied,
    #[serde(other)]
    UnknownError,
}

impl DirectionsStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, DirectionsStatus::Ok)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionsStatus::Ok => "OK",
            DirectionsStatus::NotFound => "NOT_FOUND",
            DirectionsStatus::ZeroResults => "ZERO_RESULTS",
            DirectionsStatus::MaxWaypointsExceeded => "MAX_WAYPOINTS_EXCEEDED",
            DirectionsStatus::MaxRouteLengthExceeded => "MAX_ROUTE_LENGTH_EXCEEDED",
            DirectionsStatus::InvalidRequest => "INVALID_REQUEST",
            DirectionsStatus::OverQueryLimit => "OVER_QUERY_LIMIT",
            DirectionsStatus::RequestDenied => "REQUEST_DENIED",
            DirectionsStatus::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for DirectionsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{text, value}` pair used for distances (metres) and durations (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub text: String,
    #[serde(default)]
    pub value: u64,
}

impl TextValue {
    pub fn new(text: impl Into<String>, value: u64) -> Self {
        Self {
            text: text.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Leg {
    #[serde(default)]
    pub distance: Option<TextValue>,
    #[serde(default)]
    pub duration: Option<TextValue>,
    #[serde(default)]
    pub start_address: Option<String>,
    #[serde(default)]
    pub end_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    pub points: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Route {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub legs: Vec<Leg>,
    #[serde(default)]
    pub overview_polyline: Option<Polyline>,
}

/// Full directions answer; also the payload of a rendered route overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directions {
    pub status: DirectionsStatus,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Directions {
    /// A successful answer with one route made of one leg.
    pub fn single_leg(distance: TextValue, duration: TextValue) -> Self {
        Self {
            status: DirectionsStatus::Ok,
            routes: vec![Route {
                summary: None,
                legs: vec![Leg {
                    distance: Some(distance),
                    duration: Some(duration),
                    ..Leg::default()
                }],
                overview_polyline: None,
            }],
            error_message: None,
        }
    }

    /// A failed answer carrying only a status.
    pub fn failed(status: DirectionsStatus) -> Self {
        Self {
            status,
            routes: Vec::new(),
            error_message: None,
        }
    }

    /// First leg of the first route, if any.
    pub fn primary_leg(&self) -> Option<&Leg> {
        self.routes.first()?.legs.first()
    }
}

/// Distance and travel time of a computed route, as displayed to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteResult {
    pub distance_text: String,
    pub time_text: String,
}

impl RouteResult {
    /// Extract display texts from `routes[0].legs[0]`, falling back to
    /// [`UNKNOWN_TEXT`] for any missing piece.
    pub fn from_directions(directions: &Directions) -> Self {
        let leg = directions.primary_leg();
        let text = |tv: Option<&TextValue>| {
            tv.map(|v| v.text.clone())
                .unwrap_or_else(|| UNKNOWN_TEXT.to_string())
        };
        Self {
            distance_text: text(leg.and_then(|l| l.distance.as_ref())),
            time_text: text(leg.and_then(|l| l.duration.as_ref())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_directions_answer() {
        let json = r#"{
            "status": "OK",
            "routes": [{
                "summary": "M-2",
                "legs": [{
                    "distance": {"text": "375 km", "value": 375120},
                    "duration": {"text": "4 hours 10 mins", "value": 15000},
                    "start_address": "Lahore, Pakistan",
                    "end_address": "Islamabad, Pakistan"
                }],
                "overview_polyline": {"points": "a~l~Fjk~uOwHJy@P"}
            }],
            "geocoded_waypoints": []
        }"#;
        let directions: Directions = serde_json::from_str(json).unwrap();
        assert!(directions.status.is_ok());
        let result = RouteResult::from_directions(&directions);
        assert_eq!(result.distance_text, "375 km");
        assert_eq!(result.time_text, "4 hours 10 mins");
    }

    #[test]
    fn test_unrecognized_status_maps_to_unknown_error() {
        let directions: Directions =
            serde_json::from_str(r#"{"status": "SOMETHING_NEW", "routes": []}"#).unwrap();
        assert_eq!(directions.status, DirectionsStatus::UnknownError);
    }

    #[test]
    fn test_missing_leg_texts_fall_back_to_unknown() {
        let mut directions = Directions::single_leg(TextValue::new("10 km", 10_000), TextValue::new("x", 0));
        directions.routes[0].legs[0].duration = None;
        let result = RouteResult::from_directions(&directions);
        assert_eq!(result.distance_text, "10 km");
        assert_eq!(result.time_text, UNKNOWN_TEXT);

        let empty = RouteResult::from_directions(&Directions::failed(DirectionsStatus::Ok));
        assert_eq!(empty.distance_text, UNKNOWN_TEXT);
        assert_eq!(empty.time_text, UNKNOWN_TEXT);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(DirectionsStatus::ZeroResults.to_string(), "ZERO_RESULTS");
        assert_eq!(TravelMode::Driving.as_query(), "driving");
    }
}
