//! Configuration resolution for Mechanic Hub.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/mechhub/settings.json)
//! 3. Environment variables (`MECHHUB_*`)
//! 4. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::geo::Coordinates;
use crate::lifecycle::BookConfig;

/// Complete Mechanic Hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub polling: PollingConfig,
    pub requests: RequestConfig,
    pub tracking: TrackingConfig,
    pub distance: DistanceConfig,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            polling: PollingConfig::default(),
            requests: RequestConfig::default(),
            tracking: TrackingConfig::default(),
            distance: DistanceConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

/// Backend API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Refresh intervals, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Customer's offers screen.
    pub offers_secs: u64,
    /// Offers on a single request.
    pub request_offers_secs: u64,
    /// Watching a mechanic's live location.
    pub tracking_secs: u64,
    /// Pushing this device's location.
    pub location_push_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            offers_secs: 5,
            request_offers_secs: 10,
            tracking_secs: 10,
            location_push_secs: 30,
        }
    }
}

impl PollingConfig {
    pub const fn offers(&self) -> Duration {
        Duration::from_secs(self.offers_secs)
    }

    pub const fn request_offers(&self) -> Duration {
        Duration::from_secs(self.request_offers_secs)
    }

    pub const fn tracking(&self) -> Duration {
        Duration::from_secs(self.tracking_secs)
    }

    pub const fn location_push(&self) -> Duration {
        Duration::from_secs(self.location_push_secs)
    }
}

/// Request lifecycle policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// 0 disables expiry.
    pub offer_timeout_minutes: u32,
    pub max_offers_per_request: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            offer_timeout_minutes: 30,
            max_offers_per_request: 10,
        }
    }
}

impl RequestConfig {
    pub fn to_book_config(&self) -> BookConfig {
        BookConfig {
            max_offers_per_request: self.max_offers_per_request,
            offer_timeout: (self.offer_timeout_minutes > 0)
                .then(|| chrono::Duration::minutes(i64::from(self.offer_timeout_minutes))),
        }
    }
}

/// Live location push thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub min_distance_meters: f64,
    pub accuracy_threshold_meters: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            min_distance_meters: 50.0,
            accuracy_threshold_meters: 100.0,
        }
    }
}

/// Search radius and ETA settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub max_radius_km: f64,
    pub default_radius_km: f64,
    pub average_speed_kmh: f64,
    /// Used when no device location is available (Lahore).
    pub default_location: Coordinates,
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            max_radius_km: 50.0,
            default_radius_km: 10.0,
            average_speed_kmh: 25.0,
            default_location: Coordinates::new(31.5204, 74.3587),
        }
    }
}

impl DistanceConfig {
    /// Clamp a requested search radius to `(0, max_radius_km]`, falling back
    /// to the default radius.
    pub fn radius_km(&self, requested: Option<f64>) -> f64 {
        match requested {
            Some(r) if r.is_finite() && r > 0.0 => r.min(self.max_radius_km),
            _ => self.default_radius_km,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config() -> Result<Config> {
    let mut config = match global_config_path() {
        Some(path) if path.exists() => load_config_file(&path)?,
        _ => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("mechhub").join("settings.json"))
}

/// Directory holding local client state (session, KYC database).
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".mechhub"))
}

/// Path of the local KYC review database.
pub fn kyc_database_path() -> Option<PathBuf> {
    data_dir().map(|d| d.join("kyc.db"))
}

pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Overlay `MECHHUB_*` variables obtained through `lookup`.
///
/// Unparseable numeric values are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    fn parsed<T: std::str::FromStr>(
        lookup: &impl Fn(&str) -> Option<String>,
        key: &str,
    ) -> Option<T> {
        lookup(key).and_then(|v| v.trim().parse().ok())
    }

    if let Some(val) = lookup("MECHHUB_API_URL") {
        config.api.base_url = val;
    }
    if let Some(n) = parsed(&lookup, "MECHHUB_REQUEST_TIMEOUT_SECS") {
        config.api.request_timeout_secs = n;
    }
    if let Some(n) = parsed(&lookup, "MECHHUB_POLL_OFFERS_SECS") {
        config.polling.offers_secs = n;
    }
    if let Some(n) = parsed(&lookup, "MECHHUB_POLL_REQUEST_OFFERS_SECS") {
        config.polling.request_offers_secs = n;
    }
    if let Some(n) = parsed(&lookup, "MECHHUB_POLL_TRACKING_SECS") {
        config.polling.tracking_secs = n;
    }
    if let Some(n) = parsed(&lookup, "MECHHUB_LOCATION_PUSH_SECS") {
        config.polling.location_push_secs = n;
    }
    if let Some(n) = parsed(&lookup, "MECHHUB_OFFER_TIMEOUT_MINUTES") {
        config.requests.offer_timeout_minutes = n;
    }
    if let Some(n) = parsed(&lookup, "MECHHUB_MAX_OFFERS_PER_REQUEST") {
        config.requests.max_offers_per_request = n;
    }
    if let Some(val) = lookup("MECHHUB_LOG_LEVEL") {
        config.log_level = val;
    }
}

/// Reject settings the client cannot run with.
pub fn validate(config: &Config) -> Result<()> {
    if config.api.base_url.trim().is_empty() {
        return Err(Error::Config("api.base_url must not be empty".into()));
    }
    let p = &config.polling;
    if [p.offers_secs, p.request_offers_secs, p.tracking_secs, p.location_push_secs].contains(&0) {
        return Err(Error::Config("Polling intervals must be at least 1 second".into()));
    }
    if config.requests.max_offers_per_request == 0 {
        return Err(Error::Config(
            "requests.max_offers_per_request must be at least 1".into(),
        ));
    }
    if config.distance.average_speed_kmh <= 0.0 {
        return Err(Error::Config("distance.average_speed_kmh must be positive".into()));
    }
    Ok(())
}
