use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::api::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::models::Coordinate;

pub const CONFIG_PATH: &str = "config.toml";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub location: LocationConfig,
    pub api: ApiConfig,
    pub ui: UiConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LocationSourceKind {
    Ip,     // Public IP lookup
    Manual, // manual_lat / manual_lon
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LocationConfig {
    pub source: LocationSourceKind,
    pub ask_permission: bool, // Consent prompt before every lookup
    pub manual_lat: f64,
    pub manual_lon: f64,
    pub timeout_secs: u64,
    pub ip_echo_url: String, // Returns the caller's public IP as plain text
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub tick_rate_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            source: LocationSourceKind::Ip,
            ask_permission: true,
            manual_lat: 37.7749,
            manual_lon: -122.4194,
            timeout_secs: 10,
            ip_echo_url: "https://api.ipify.org".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self { tick_rate_ms: 150 }
    }
}

impl LocationConfig {
    pub fn manual_coordinate(&self) -> Coordinate {
        Coordinate::new(self.manual_lat, self.manual_lon)
    }
}

impl Config {
    /// Loads config.toml from the working directory.
    /// If it doesn't exist, creates a default one.
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_PATH))
    }

    pub fn load_from(path: &Path) -> Self {
        if let Ok(content) = fs::read_to_string(path) {
            match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => {
                    warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    return Config::default();
                }
            }
        }

        let default_config = Config::default();

        // Save default config to disk for the user to edit later
        match toml::to_string_pretty(&default_config) {
            Ok(toml_string) => {
                if fs::write(path, toml_string).is_err() {
                    warn!("Could not write default {} to disk.", path.display());
                }
            }
            Err(e) => warn!("Could not serialize default config: {}", e),
        }

        info!("Loaded default configuration.");
        default_config
    }
}

/// Reads the Gemini API key from the environment.
pub fn api_key_from_env() -> Option<String> {
    ["GEMINI_API_KEY", "API_KEY"]
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("fairway-config-{}-{}", name, std::process::id()));
        let _ = fs::create_dir_all(&dir);
        dir.join("config.toml")
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let parsed: Config = toml::from_str(
            r#"
            [location]
            source = "manual"
            manual_lat = 51.5
            "#,
        )
        .unwrap();

        assert_eq!(parsed.location.source, LocationSourceKind::Manual);
        assert_eq!(parsed.location.manual_lat, 51.5);
        assert_eq!(parsed.location.manual_lon, -122.4194);
        assert_eq!(parsed.location.timeout_secs, 10);
        assert!(parsed.location.ask_permission);
        assert_eq!(parsed.api.model, "gemini-2.5-flash");
        assert_eq!(parsed.ui.tick_rate_ms, 150);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let path = scratch_path("missing");
        let _ = fs::remove_file(&path);

        let config = Config::load_from(&path);
        assert_eq!(config, Config::default());

        let written = fs::read_to_string(&path).unwrap();
        let reread: Config = toml::from_str(&written).unwrap();
        assert_eq!(reread, config);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let path = scratch_path("broken");
        fs::write(&path, "this is = = not toml").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());
        // The broken file is left for the user to fix.
        assert_eq!(fs::read_to_string(&path).unwrap(), "this is = = not toml");
    }
}
