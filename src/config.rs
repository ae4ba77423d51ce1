//! Application and per-instance configuration
//!
//! Loaded from TOML. Every field has a default so a missing or partial file
//! still yields a usable configuration.
//!
//! ```toml
//! cdn_root = "https://cdn.aframe.io/"
//! output_capacity = 256
//!
//! [collector]
//! poll_interval_us = 100
//! axis_deadzone = 0.05
//! device_profiles = ["logitech-mx-ink"]
//!
//! [[controls]]
//! hand = "right"
//! model = true
//! orientation_offset = [0.0, 0.0, 0.0]
//! ```

use crate::controller::event_collector::CollectorSettings;
use crate::controller::mapping_table::Hand;
use crate::lifecycle::component::AFRAME_CDN_ROOT;
use color_eyre::eyre::{ensure, Result, WrapErr};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Configuration of one adapter instance
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ControlsConfig {
    pub hand: Hand,
    /// Request and show the controller model
    pub model: bool,
    pub orientation_offset: Vec3,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            hand: Hand::Left,
            model: true,
            orientation_offset: Vec3::ZERO,
        }
    }
}

/// Gamepad polling settings for the binary
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CollectorConfig {
    pub poll_interval_us: u64,
    pub axis_deadzone: f32,
    /// Alternate profile ids announced for every connected gamepad
    pub device_profiles: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            poll_interval_us: 100,
            axis_deadzone: 0.05,
            device_profiles: Vec::new(),
        }
    }
}

impl From<CollectorConfig> for CollectorSettings {
    fn from(config: CollectorConfig) -> Self {
        Self {
            poll_interval_us: config.poll_interval_us,
            axis_deadzone: config.axis_deadzone,
            device_profiles: config.device_profiles,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub cdn_root: String,
    /// Capacity of the semantic event channel
    pub output_capacity: usize,
    pub collector: CollectorConfig,
    pub controls: Vec<ControlsConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cdn_root: AFRAME_CDN_ROOT.to_string(),
            output_capacity: 256,
            collector: CollectorConfig::default(),
            controls: vec![
                ControlsConfig::default(),
                ControlsConfig {
                    hand: Hand::Right,
                    ..ControlsConfig::default()
                },
            ],
        }
    }
}

impl AppConfig {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mx-ink-controls").join("config.toml"))
    }

    /// Loads `path`, or the default location when `None`
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) => path,
                None => {
                    warn!("No config directory available, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            info!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        debug!("Reading configuration from {}", path.display());
        let raw = fs::read_to_string(&path)
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .wrap_err_with(|| format!("Invalid configuration in {}", path.display()))?;
        info!(
            "Loaded configuration from {} ({} instance(s))",
            path.display(),
            config.controls.len()
        );
        Ok(config)
    }

    /// Parses and validates a configuration document
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.output_capacity > 0,
            "output_capacity must be at least 1"
        );
        ensure!(
            (0.0..1.0).contains(&self.collector.axis_deadzone),
            "axis_deadzone must be in [0, 1), got {}",
            self.collector.axis_deadzone
        );
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml("").expect("valid toml");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.controls[0].hand, Hand::Left);
        assert_eq!(config.controls[1].hand, Hand::Right);
        assert!(config.controls.iter().all(|c| c.model));
    }

    #[test]
    fn parses_partial_instance_tables() {
        let config = AppConfig::from_toml(
            r#"
            cdn_root = "http://localhost:8000/"

            [collector]
            device_profiles = ["logitech-mx-ink"]

            [[controls]]
            hand = "right"
            model = false
            orientation_offset = [0.0, 15.0, 0.0]
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.cdn_root, "http://localhost:8000/");
        assert_eq!(config.output_capacity, 256);
        assert_eq!(config.collector.device_profiles, vec!["logitech-mx-ink"]);
        assert_eq!(config.collector.poll_interval_us, 100);
        assert_eq!(
            config.controls,
            vec![ControlsConfig {
                hand: Hand::Right,
                model: false,
                orientation_offset: Vec3::new(0.0, 15.0, 0.0),
            }]
        );
    }

    #[test]
    fn rejects_unknown_hands() {
        assert!(AppConfig::from_toml("[[controls]]\nhand = \"middle\"\n").is_err());
    }

    #[test]
    fn rejects_a_zero_output_capacity() {
        let err = AppConfig::from_toml("output_capacity = 0\n").expect_err("invalid capacity");
        assert!(err.to_string().contains("output_capacity"));
        assert!(AppConfig::from_toml("output_capacity = 1\n").is_ok());
    }

    #[test]
    fn rejects_a_deadzone_covering_the_whole_range() {
        assert!(AppConfig::from_toml("[collector]\naxis_deadzone = 1.0\n").is_err());
    }

    #[test]
    fn load_reports_invalid_files() {
        let dir = std::env::temp_dir().join(format!("mx-ink-controls-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("config.toml");
        fs::write(&path, "output_capacity = 0\n").expect("writable temp file");

        assert!(AppConfig::load(Some(&path)).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn round_trips_through_toml() {
        let config = AppConfig::default();
        let raw = config.to_toml().expect("serializable");
        assert_eq!(AppConfig::from_toml(&raw).expect("valid toml"), config);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("mx-ink-controls-missing").join("config.toml");
        let config = AppConfig::load(Some(&path)).expect("defaults");
        assert_eq!(config, AppConfig::default());
    }
}
