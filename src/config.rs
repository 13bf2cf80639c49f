//! Configuration management for playback and comparison defaults
//!
//! This module provides runtime configuration loading from JSON files so the
//! chunk size, event plumbing and comparison defaults can be adjusted without
//! recompilation. The NSIM constants themselves are fixed and not configurable.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub comparison: ComparisonConfig,
}

/// Playback engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Frames requested from the device per callback
    pub chunk_size: u32,
    /// Capacity of the audio-thread -> playback-thread event ring
    pub event_ring_capacity: usize,
    /// Capacity of the broadcast channel handed to subscribers
    pub broadcast_capacity: usize,
    /// How often the playback thread drains position events
    pub position_poll_interval_ms: u64,
    /// Initial output gain in [0, 1]
    pub volume: f32,
    /// Output device name, `None` for the host default
    pub device: Option<String>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            event_ring_capacity: 256,
            broadcast_capacity: 128,
            position_poll_interval_ms: 10,
            volume: 1.0,
            device: None,
        }
    }
}

/// Defaults for coefficient comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// Number of bins per frame in raw coefficient files
    pub dim: usize,
    /// Frame shift in seconds (map row -> time axis)
    pub frameshift: f64,
    /// Cells at or above this value count as "identical" in summaries
    pub summary_threshold: f64,
    /// Smooth both matrices with the NSIM window before comparing
    pub smooth: bool,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            dim: 40,
            frameshift: 0.005,
            summary_threshold: 0.99,
            smooth: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or the defaults if the file is missing or
    /// the JSON is invalid (a warning is logged in both cases).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.playback.chunk_size, 1024);
        assert_eq!(config.playback.volume, 1.0);
        assert!(config.playback.device.is_none());
        assert_eq!(config.comparison.dim, 40);
        assert_eq!(config.comparison.summary_threshold, 0.99);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = AppConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.playback.chunk_size, config.playback.chunk_size);
        assert_eq!(parsed.comparison.frameshift, config.comparison.frameshift);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"comparison": {"dim": 64, "frameshift": 0.01, "summary_threshold": 0.95, "smooth": true}}"#)
                .unwrap();
        assert_eq!(parsed.comparison.dim, 64);
        assert!(parsed.comparison.smooth);
        assert_eq!(parsed.playback.chunk_size, 1024);
    }

    #[test]
    fn test_partial_sections_fill_missing_fields() {
        let parsed: AppConfig = serde_json::from_str(
            r#"{"playback": {"chunk_size": 512}, "comparison": {"smooth": true}}"#,
        )
        .unwrap();
        assert_eq!(parsed.playback.chunk_size, 512);
        assert_eq!(parsed.playback.event_ring_capacity, 256);
        assert_eq!(parsed.playback.volume, 1.0);
        assert!(parsed.comparison.smooth);
        assert_eq!(
            parsed.comparison.dim,
            ComparisonConfig::default().dim
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::load_from_file("/nonexistent/spiny-config.json");
        assert_eq!(config.playback.chunk_size, 1024);
    }
}
