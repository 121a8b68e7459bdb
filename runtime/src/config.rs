//! Runtime configuration.
//!
//! Layered in increasing precedence: built-in defaults, a JSON file
//! (`~/.travelers/config.json` unless `--config` names another), environment
//! variables, then command-line flags applied by the CLI.

use crate::bootstrap::guard::DEFAULT_POLL_INTERVAL_MS;
use crate::bootstrap::ReadinessWait;
use crate::geo::{LatLng, LatLngBounds, DEFAULT_CENTER, DEFAULT_ZOOM, PAKISTAN_BOUNDS};
use crate::sdk::http::DEFAULT_BASE_URL;
use crate::sdk::{HttpLoader, LoaderOptions};
use crate::session::{ControllerOptions, RouteFailurePolicy, StaleRoutePolicy};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_KEY: &str = "TRAVELERS_MAPS_API_KEY";
/// Fallback key variable, shared with other Google Maps tooling.
pub const ENV_GOOGLE_API_KEY: &str = "GOOGLE_MAPS_API_KEY";
pub const ENV_BASE_URL: &str = "TRAVELERS_MAPS_BASE_URL";
pub const ENV_READINESS: &str = "TRAVELERS_READINESS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub api_key: Option<String>,
    pub loader: LoaderOptions,
    pub base_url: String,
    pub center: LatLng,
    pub zoom: i32,
    /// Viewport restriction; `null` lets the map pan anywhere.
    pub restriction: Option<LatLngBounds>,
    pub readiness: ReadinessWait,
    pub route_failure: RouteFailurePolicy,
    pub stale_routes: StaleRoutePolicy,
    pub request_timeout_ms: u64,
    /// Session journal; disabled when unset.
    pub journal_path: Option<PathBuf>,
    /// Verify the API key with a geocoding request while loading.
    pub probe: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            loader: LoaderOptions::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            restriction: Some(PAKISTAN_BOUNDS),
            readiness: ReadinessWait::Notify,
            route_failure: RouteFailurePolicy::Silent,
            stale_routes: StaleRoutePolicy::Complete,
            request_timeout_ms: 10_000,
            journal_path: None,
            probe: false,
        }
    }
}

impl MapConfig {
    /// Default config file location, ~/.travelers/config.json.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".travelers")
            .join("config.json")
    }

    /// Load defaults, then the config file, then the process environment.
    ///
    /// An explicit `path` must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Self::default_path();
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("invalid config: {}", path.display()))
    }

    /// Write this config as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json + "\n")
            .with_context(|| format!("failed to write config: {}", path.display()))
    }

    /// Override fields from environment variables read through `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY).or_else(|| non_empty(ENV_GOOGLE_API_KEY)) {
            self.api_key = Some(key);
        }
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.base_url = url;
        }
        if let Some(readiness) = non_empty(ENV_READINESS) {
            self.readiness =
                parse_readiness(&readiness).with_context(|| format!("invalid {ENV_READINESS}"))?;
        }
        Ok(())
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            api_key: self.api_key.clone().unwrap_or_default(),
            loader: self.loader.clone(),
            readiness: self.readiness,
            restriction: self.restriction,
            route_failure: self.route_failure,
            stale_routes: self.stale_routes,
        }
    }

    pub fn http_loader(&self) -> HttpLoader {
        HttpLoader::new(&self.base_url, Duration::from_millis(self.request_timeout_ms)).with_probe(self.probe)
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.api_key = copy.api_key.as_deref().map(mask_key);
        copy
    }
}

/// Parse `notify`, `poll`, or `poll:<interval_ms>`.
pub fn parse_readiness(value: &str) -> Result<ReadinessWait> {
    let value = value.trim().to_ascii_lowercase();
    match value.split_once(':') {
        None if value == "notify" => Ok(ReadinessWait::Notify),
        None if value == "poll" => Ok(ReadinessWait::Poll {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }),
        Some(("poll", ms)) => {
            let interval_ms: u64 = ms.parse().with_context(|| format!("bad poll interval {ms:?}"))?;
            if interval_ms == 0 {
                bail!("poll interval must be positive");
            }
            Ok(ReadinessWait::Poll { interval_ms })
        }
        _ => bail!("expected notify, poll or poll:<ms>, got {value:?}"),
    }
}

fn mask_key(key: &str) -> String {
    let count = key.chars().count();
    if count <= 8 {
        return "****".to_string();
    }
    let tail: String = key.chars().skip(count - 4).collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_match_hero_map() {
        let config = MapConfig::default();
        assert_eq!(config.center, DEFAULT_CENTER);
        assert_eq!(config.zoom, 6);
        assert_eq!(config.loader.version, "weekly");
        assert_eq!(config.loader.libraries, vec!["places".to_string()]);
        assert_eq!(config.readiness, ReadinessWait::Notify);
        assert_eq!(config.route_failure, RouteFailurePolicy::Silent);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"zoom": 8, "readiness": {"strategy": "poll", "interval_ms": 250}, "stale_routes": "supersede"}"#,
        )
        .unwrap();

        let config = MapConfig::from_file(&path).unwrap();
        assert_eq!(config.zoom, 8);
        assert_eq!(config.readiness, ReadinessWait::Poll { interval_ms: 250 });
        assert_eq!(config.stale_routes, StaleRoutePolicy::Supersede);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.restriction, Some(PAKISTAN_BOUNDS));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");
        let config = MapConfig {
            journal_path: Some(dir.path().join("journal.jsonl")),
            restriction: None,
            ..MapConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(MapConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MapConfig::load(Some(&dir.path().join("absent.json"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = MapConfig::default();
        config
            .apply_env(env(&[
                (ENV_GOOGLE_API_KEY, "google-key"),
                (ENV_BASE_URL, "http://localhost:9000"),
                (ENV_READINESS, "poll:50"),
            ]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("google-key"));
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.readiness, ReadinessWait::Poll { interval_ms: 50 });

        // The dedicated variable wins over the shared one; blanks are ignored.
        config
            .apply_env(env(&[(ENV_API_KEY, "own-key"), (ENV_GOOGLE_API_KEY, "google-key"), (ENV_BASE_URL, " ")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("own-key"));
        assert_eq!(config.base_url, "http://localhost:9000");

        assert!(config.apply_env(env(&[(ENV_READINESS, "eventually")])).is_err());
    }

    #[test]
    fn test_parse_readiness() {
        assert_eq!(parse_readiness("Notify").unwrap(), ReadinessWait::Notify);
        assert_eq!(
            parse_readiness("poll").unwrap(),
            ReadinessWait::Poll {
                interval_ms: DEFAULT_POLL_INTERVAL_MS
            }
        );
        assert!(parse_readiness("poll:0").is_err());
        assert!(parse_readiness("poll:fast").is_err());
    }

    #[test]
    fn test_redacted_masks_key() {
        let config = MapConfig {
            api_key: Some("AIzaSyExampleKey1234".into()),
            ..MapConfig::default()
        };
        assert_eq!(config.redacted().api_key.as_deref(), Some("****1234"));
        assert_eq!(
            MapConfig {
                api_key: Some("short".into()),
                ..MapConfig::default()
            }
            .redacted()
            .api_key
            .as_deref(),
            Some("****")
        );
        assert_eq!(MapConfig::default().redacted().api_key, None);
    }

    #[test]
    fn test_controller_options_carry_policies() {
        let config = MapConfig {
            api_key: Some("k".into()),
            route_failure: RouteFailurePolicy::Propagate,
            ..MapConfig::default()
        };
        let options = config.controller_options();
        assert_eq!(options.api_key, "k");
        assert_eq!(options.route_failure, RouteFailurePolicy::Propagate);
        assert_eq!(options.restriction, Some(PAKISTAN_BOUNDS));
    }
}
