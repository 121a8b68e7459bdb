//! HTTP-backed SDK speaking the Google Maps web-service JSON APIs.
//!
//! Widgets are headless; only directions and geocoding leave the process.

use super::{HeadlessMap, LoaderOptions, MapOptions, MapWidget, MapsSdk, SdkLoader};
use crate::error::{GeocodeError, LoadError, RouteError};
use crate::geo::LatLng;
use crate::route::{Directions, RouteRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default web-service root.
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api";

/// Address used to verify the key during bootstrap.
const PROBE_ADDRESS: &str = "Pakistan";

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

/// Loader producing an [`HttpMapsSdk`].
#[derive(Debug, Clone)]
pub struct HttpLoader {
    base_url: String,
    timeout: Duration,
    probe: bool,
}

impl HttpLoader {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
            probe: false,
        }
    }

    /// Verify the key with a geocoding request during `load`.
    pub fn with_probe(mut self, probe: bool) -> Self {
        self.probe = probe;
        self
    }
}

impl Default for HttpLoader {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, Duration::from_secs(10))
    }
}

#[async_trait]
impl SdkLoader for HttpLoader {
    async fn load(&self, api_key: &str, options: &LoaderOptions) -> Result<Arc<dyn MapsSdk>, LoadError> {
        if api_key.trim().is_empty() {
            return Err(LoadError::MissingApiKey);
        }

        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("travelers-map/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let sdk = HttpMapsSdk {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        };

        if self.probe {
            sdk.probe().await?;
        }

        info!(
            "maps SDK ready (version {}, libraries {:?})",
            options.version, options.libraries
        );
        Ok(Arc::new(sdk))
    }
}

/// Directions and geocoding over HTTP.
pub struct HttpMapsSdk {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpMapsSdk {
    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url, String> {
        let mut url = Url::parse(&format!("{}/{path}", self.base_url)).map_err(|e| e.to_string())?;
        url.query_pairs_mut()
            .extend_pairs(params)
            .append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn fetch_geocode(&self, address: &str) -> Result<GeocodeResponse, GeocodeError> {
        let url = self
            .endpoint("geocode/json", &[("address", address)])
            .map_err(GeocodeError::Transport)?;
        debug!("geocode {address:?}");
        let response = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<GeocodeResponse>()
            .await?;
        Ok(response)
    }

    async fn probe(&self) -> Result<(), LoadError> {
        let response = self.fetch_geocode(PROBE_ADDRESS).await.map_err(|e| match e {
            GeocodeError::Transport(msg) => LoadError::Network(msg),
            other => LoadError::Sdk(other.to_string()),
        })?;
        if response.status == "REQUEST_DENIED" {
            return Err(LoadError::Auth(
                response.error_message.unwrap_or(response.status),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MapsSdk for HttpMapsSdk {
    fn create_map(&self, options: MapOptions) -> Arc<dyn MapWidget> {
        Arc::new(HeadlessMap::new(options))
    }

    async fn route(&self, request: &RouteRequest) -> Result<Directions, RouteError> {
        let origin = request.origin.as_query();
        let destination = request.destination.as_query();
        let url = self
            .endpoint(
                "directions/json",
                &[
                    ("origin", origin.as_str()),
                    ("destination", destination.as_str()),
                    ("mode", request.travel_mode.as_query()),
                ],
            )
            .map_err(RouteError::Transport)?;

        debug!("directions {origin:?} -> {destination:?}");
        let directions = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Directions>()
            .await?;
        Ok(directions)
    }

    async fn geocode(&self, address: &str) -> Result<LatLng, GeocodeError> {
        let response = self.fetch_geocode(address).await?;
        match response.status.as_str() {
            "OK" => response
                .results
                .into_iter()
                .next()
                .map(|r| r.geometry.location)
                .ok_or_else(|| GeocodeError::NoResults(address.to_string())),
            "ZERO_RESULTS" => Err(GeocodeError::NoResults(address.to_string())),
            other => Err(GeocodeError::Status(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Place;
    use crate::route::DirectionsStatus;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn load(server: &MockServer, probe: bool) -> Result<Arc<dyn MapsSdk>, LoadError> {
        HttpLoader::new(server.uri(), Duration::from_secs(5))
            .with_probe(probe)
            .load("test-key", &LoaderOptions::default())
            .await
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let result = HttpLoader::default().load("  ", &LoaderOptions::default()).await;
        assert_eq!(result.err(), Some(LoadError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_route_parses_first_leg() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .and(query_param("origin", "CityA"))
            .and(query_param("destination", "CityB"))
            .and(query_param("mode", "driving"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "routes": [{"legs": [{
                    "distance": {"text": "10 km", "value": 10000},
                    "duration": {"text": "15 mins", "value": 900}
                }]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let sdk = load(&server, false).await.unwrap();
        let request = RouteRequest::driving(Place::from("CityA"), Place::from("CityB"));
        let directions = sdk.route(&request).await.unwrap();
        assert!(directions.status.is_ok());
        let leg = directions.primary_leg().unwrap();
        assert_eq!(leg.distance.as_ref().unwrap().text, "10 km");
        assert_eq!(leg.duration.as_ref().unwrap().text, "15 mins");
    }

    #[tokio::test]
    async fn test_route_non_ok_status_is_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ZERO_RESULTS",
                "routes": []
            })))
            .mount(&server)
            .await;

        let sdk = load(&server, false).await.unwrap();
        let request = RouteRequest::driving(Place::from("Nowhere"), Place::from("Elsewhere"));
        let directions = sdk.route(&request).await.unwrap();
        assert_eq!(directions.status, DirectionsStatus::ZeroResults);
    }

    #[tokio::test]
    async fn test_route_http_error_is_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/directions/json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sdk = load(&server, false).await.unwrap();
        let request = RouteRequest::driving(Place::from("A"), Place::from("B"));
        assert!(matches!(sdk.route(&request).await, Err(RouteError::Transport(_))));
    }

    #[tokio::test]
    async fn test_geocode_first_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode/json"))
            .and(query_param("address", "Lahore"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": [
                    {"geometry": {"location": {"lat": 31.5204, "lng": 74.3587}}},
                    {"geometry": {"location": {"lat": 0.0, "lng": 0.0}}}
                ]
            })))
            .mount(&server)
            .await;

        let sdk = load(&server, false).await.unwrap();
        assert_eq!(sdk.geocode("Lahore").await.unwrap(), LatLng::new(31.5204, 74.3587));
    }

    #[tokio::test]
    async fn test_geocode_zero_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ZERO_RESULTS",
                "results": []
            })))
            .mount(&server)
            .await;

        let sdk = load(&server, false).await.unwrap();
        assert_eq!(
            sdk.geocode("Atlantis").await,
            Err(GeocodeError::NoResults("Atlantis".into()))
        );
    }

    #[tokio::test]
    async fn test_probe_denied_key_is_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "REQUEST_DENIED",
                "error_message": "The provided API key is invalid.",
                "results": []
            })))
            .mount(&server)
            .await;

        let result = load(&server, true).await;
        assert_eq!(
            result.err(),
            Some(LoadError::Auth("The provided API key is invalid.".into()))
        );
    }
}
