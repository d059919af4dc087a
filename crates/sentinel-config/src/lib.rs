//! Configuration for the sentinel console, loaded from TOML with per-field
//! defaults so a partial file stays valid across upgrades.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_SENTINEL_CONFIG: &str = "SENTINEL_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "./sentinel.toml";
const DEFAULT_VISIBLE_WINDOW: usize = 50;
const DEFAULT_DEFERRED_WINDOW: usize = 5;
const DEFAULT_STAGGER_MS: u64 = 120;
const DEFAULT_FIRST_DELAY_SECS: u64 = 8;
const DEFAULT_SCAN_INTERVAL_SECS: u64 = 45;
const DEFAULT_TICK_CADENCE_MS: u64 = 1000;
const DEFAULT_SERVICE_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_ACCURACY_FLOOR: f64 = 90.0;
const DEFAULT_ACCURACY_CEILING: f64 = 99.8;
const DEFAULT_FALSE_POSITIVE_FLOOR: f64 = 0.3;
const DEFAULT_FALSE_POSITIVE_CEILING: f64 = 9.5;
const DEFAULT_LATENCY_FLOOR_SECS: f64 = 6.0;
const DEFAULT_FEEDBACK_BASELINE: u64 = 1240;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SentinelConfig {
    #[serde(default)]
    pub feed: FeedConfigToml,
    #[serde(default)]
    pub scan: ScanConfigToml,
    #[serde(default)]
    pub metrics: MetricsConfigToml,
    #[serde(default)]
    pub service: ServiceConfigToml,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfigToml {
    #[serde(default = "default_visible_window")]
    pub visible_window: usize,
    #[serde(default = "default_deferred_window")]
    pub deferred_window: usize,
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfigToml {
    #[serde(default = "default_first_delay_secs")]
    pub first_delay_secs: u64,
    #[serde(default = "default_scan_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_tick_cadence_ms")]
    pub tick_cadence_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfigToml {
    #[serde(default = "default_accuracy_floor")]
    pub accuracy_floor: f64,
    #[serde(default = "default_accuracy_ceiling")]
    pub accuracy_ceiling: f64,
    #[serde(default = "default_false_positive_floor")]
    pub false_positive_floor: f64,
    #[serde(default = "default_false_positive_ceiling")]
    pub false_positive_ceiling: f64,
    #[serde(default = "default_latency_floor_secs")]
    pub latency_floor_secs: f64,
    #[serde(default = "default_feedback_baseline")]
    pub feedback_baseline: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfigToml {
    #[serde(default = "default_service_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for FeedConfigToml {
    fn default() -> Self {
        Self {
            visible_window: DEFAULT_VISIBLE_WINDOW,
            deferred_window: DEFAULT_DEFERRED_WINDOW,
            stagger_ms: DEFAULT_STAGGER_MS,
        }
    }
}

impl Default for ScanConfigToml {
    fn default() -> Self {
        Self {
            first_delay_secs: DEFAULT_FIRST_DELAY_SECS,
            interval_secs: DEFAULT_SCAN_INTERVAL_SECS,
            tick_cadence_ms: DEFAULT_TICK_CADENCE_MS,
        }
    }
}

impl Default for MetricsConfigToml {
    fn default() -> Self {
        Self {
            accuracy_floor: DEFAULT_ACCURACY_FLOOR,
            accuracy_ceiling: DEFAULT_ACCURACY_CEILING,
            false_positive_floor: DEFAULT_FALSE_POSITIVE_FLOOR,
            false_positive_ceiling: DEFAULT_FALSE_POSITIVE_CEILING,
            latency_floor_secs: DEFAULT_LATENCY_FLOOR_SECS,
            feedback_baseline: DEFAULT_FEEDBACK_BASELINE,
        }
    }
}

impl Default for ServiceConfigToml {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVICE_BASE_URL.to_owned(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

fn default_visible_window() -> usize {
    DEFAULT_VISIBLE_WINDOW
}

fn default_deferred_window() -> usize {
    DEFAULT_DEFERRED_WINDOW
}

fn default_stagger_ms() -> u64 {
    DEFAULT_STAGGER_MS
}

fn default_first_delay_secs() -> u64 {
    DEFAULT_FIRST_DELAY_SECS
}

fn default_scan_interval_secs() -> u64 {
    DEFAULT_SCAN_INTERVAL_SECS
}

fn default_tick_cadence_ms() -> u64 {
    DEFAULT_TICK_CADENCE_MS
}

fn default_accuracy_floor() -> f64 {
    DEFAULT_ACCURACY_FLOOR
}

fn default_accuracy_ceiling() -> f64 {
    DEFAULT_ACCURACY_CEILING
}

fn default_false_positive_floor() -> f64 {
    DEFAULT_FALSE_POSITIVE_FLOOR
}

fn default_false_positive_ceiling() -> f64 {
    DEFAULT_FALSE_POSITIVE_CEILING
}

fn default_latency_floor_secs() -> f64 {
    DEFAULT_LATENCY_FLOOR_SECS
}

fn default_feedback_baseline() -> u64 {
    DEFAULT_FEEDBACK_BASELINE
}

fn default_service_base_url() -> String {
    DEFAULT_SERVICE_BASE_URL.to_owned()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

pub fn load_from_env() -> Result<SentinelConfig, ConfigError> {
    let path = match std::env::var(ENV_SENTINEL_CONFIG) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => DEFAULT_CONFIG_PATH.to_owned(),
    };
    load_from_path(path)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<SentinelConfig, ConfigError> {
    let config = load_or_create_config(path.as_ref())?;
    validate(&config)?;
    Ok(config)
}

fn load_or_create_config(path: &Path) -> Result<SentinelConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            let default_config = SentinelConfig::default();
            let rendered = toml::to_string_pretty(&default_config).map_err(|err| {
                ConfigError::configuration(format!("failed to render default config: {err}"))
            })?;
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        ConfigError::configuration(format!(
                            "failed to create config directory '{}': {err}",
                            parent.display()
                        ))
                    })?;
                }
            }
            std::fs::write(path, rendered).map_err(|err| {
                ConfigError::configuration(format!(
                    "failed to write default config '{}': {err}",
                    path.display()
                ))
            })?;
            return Ok(default_config);
        }
        Err(error) => {
            return Err(ConfigError::configuration(format!(
                "failed to read config '{}': {error}",
                path.display()
            )))
        }
    };

    toml::from_str(&raw).map_err(|err| {
        ConfigError::configuration(format!("failed to parse config '{}': {err}", path.display()))
    })
}

fn validate(config: &SentinelConfig) -> Result<(), ConfigError> {
    if config.feed.visible_window == 0 {
        return Err(ConfigError::configuration(
            "feed.visible_window must be greater than 0",
        ));
    }
    if config.feed.stagger_ms == 0 {
        return Err(ConfigError::configuration(
            "feed.stagger_ms must be greater than 0",
        ));
    }
    if config.scan.interval_secs == 0 {
        return Err(ConfigError::configuration(
            "scan.interval_secs must be greater than 0",
        ));
    }
    if config.scan.tick_cadence_ms == 0 {
        return Err(ConfigError::configuration(
            "scan.tick_cadence_ms must be greater than 0",
        ));
    }
    if config.metrics.accuracy_floor >= config.metrics.accuracy_ceiling {
        return Err(ConfigError::configuration(
            "metrics.accuracy_floor must be below metrics.accuracy_ceiling",
        ));
    }
    if config.metrics.false_positive_floor >= config.metrics.false_positive_ceiling {
        return Err(ConfigError::configuration(
            "metrics.false_positive_floor must be below metrics.false_positive_ceiling",
        ));
    }
    if config.service.base_url.trim().is_empty() {
        return Err(ConfigError::configuration(
            "service.base_url must not be blank",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("sentinel-config-{}-{name}.toml", std::process::id()))
    }

    #[test]
    fn missing_file_writes_defaults_and_loads_them() {
        let path = temp_config_path("missing");
        let _ = std::fs::remove_file(&path);

        let config = load_from_path(&path).expect("load default config");
        assert_eq!(config, SentinelConfig::default());
        assert!(path.exists());

        let reloaded = load_from_path(&path).expect("reload persisted config");
        assert_eq!(reloaded, config);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn partial_file_fills_remaining_fields_with_defaults() {
        let path = temp_config_path("partial");
        std::fs::write(&path, "[feed]\nvisible_window = 10\n").expect("write partial config");

        let config = load_from_path(&path).expect("load partial config");
        assert_eq!(config.feed.visible_window, 10);
        assert_eq!(config.feed.stagger_ms, DEFAULT_STAGGER_MS);
        assert_eq!(config.scan.interval_secs, DEFAULT_SCAN_INTERVAL_SECS);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn zero_windows_and_inverted_clamps_are_rejected() {
        let path = temp_config_path("invalid-window");
        std::fs::write(&path, "[feed]\nvisible_window = 0\n").expect("write invalid config");
        let error = load_from_path(&path).expect_err("zero visible window should be rejected");
        assert!(error.to_string().contains("visible_window"));
        let _ = std::fs::remove_file(&path);

        let path = temp_config_path("invalid-clamp");
        std::fs::write(
            &path,
            "[metrics]\naccuracy_floor = 99.9\naccuracy_ceiling = 99.8\n",
        )
        .expect("write invalid config");
        let error = load_from_path(&path).expect_err("inverted clamp should be rejected");
        assert!(error.to_string().contains("accuracy_floor"));
        let _ = std::fs::remove_file(&path);
    }
}
