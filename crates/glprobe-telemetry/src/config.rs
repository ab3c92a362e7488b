// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Debug session configuration.

use crate::counters::WrapOptions;
use crate::error::TelemetryError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How much a session observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugMode {
    /// No call tracking. Resource tracking stays on.
    Off,
    /// Call tracking every frame, whole-frame GPU timing on a random subset.
    #[default]
    Sampled,
    /// Call tracking and whole-frame GPU timing every frame.
    Full,
}

/// Options of a [`DebugSession`](crate::session::DebugSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Observation mode.
    pub mode: DebugMode,
    /// Probability of timing a frame in `Sampled` mode, in `[0, 1]`.
    pub sample_rate: f64,
    /// Log every resource creation with its call stack.
    pub log_creates: bool,
    /// Seed of the sampling generator; entropy when absent.
    pub seed: Option<u64>,
    /// Frame-rate samples kept for the moving average.
    pub fps_window: usize,
    /// GPU samples kept per timer label for percentiles.
    pub timer_window: usize,
    /// Count texture binds while tracking calls.
    pub track_binds: bool,
    /// Count program changes while tracking calls.
    pub track_programs: bool,
    /// Count instanced draws while tracking calls.
    pub track_instancing: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: DebugMode::Sampled,
            sample_rate: 0.25,
            log_creates: false,
            seed: None,
            fps_window: 60,
            timer_window: 120,
            track_binds: true,
            track_programs: true,
            track_instancing: true,
        }
    }
}

impl SessionConfig {
    /// A configuration with the given mode and defaults elsewhere.
    pub fn with_mode(mode: DebugMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, TelemetryError> {
        serde_json::from_str::<Self>(json)
            .map(Self::validated)
            .map_err(|e| TelemetryError::Config(e.to_string()))
    }

    /// Load a configuration from a RON string.
    pub fn from_ron(text: &str) -> Result<Self, TelemetryError> {
        ron::from_str::<Self>(text)
            .map(Self::validated)
            .map_err(|e| TelemetryError::Config(e.to_string()))
    }

    /// Load a configuration from a `.json` or `.ron` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TelemetryError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| TelemetryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("ron") => Self::from_ron(&content),
            _ => Err(TelemetryError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Serialize this configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String, TelemetryError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Save this configuration to a JSON file.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), TelemetryError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).map_err(|source| TelemetryError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Clamps numeric options into their valid ranges.
    pub fn validated(mut self) -> Self {
        if !self.sample_rate.is_finite() {
            log::warn!("Non-finite sample rate in configuration, using 0");
            self.sample_rate = 0.0;
        }
        self.sample_rate = self.sample_rate.clamp(0.0, 1.0);
        self.fps_window = self.fps_window.max(1);
        self.timer_window = self.timer_window.max(1);
        self
    }

    /// The interception options this configuration asks for, or `None` when
    /// the mode disables call tracking.
    pub fn wrap_options(&self) -> Option<WrapOptions> {
        match self.mode {
            DebugMode::Off => None,
            DebugMode::Sampled | DebugMode::Full => Some(WrapOptions {
                track_binds: self.track_binds,
                track_programs: self.track_programs,
                track_instancing: self.track_instancing,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.mode, DebugMode::Sampled);
        assert_eq!(config.sample_rate, 0.25);
        assert_eq!(config.fps_window, 60);
        assert_eq!(config.timer_window, 120);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SessionConfig::from_json(r#"{ "mode": "full", "log_creates": true }"#).unwrap();
        assert_eq!(config.mode, DebugMode::Full);
        assert!(config.log_creates);
        assert_eq!(config.sample_rate, 0.25);
    }

    #[test]
    fn test_sample_rate_is_clamped() {
        let config = SessionConfig::from_json(r#"{ "sample_rate": 3.5 }"#).unwrap();
        assert_eq!(config.sample_rate, 1.0);
        let config = SessionConfig::from_json(r#"{ "sample_rate": -1.0 }"#).unwrap();
        assert_eq!(config.sample_rate, 0.0);
    }

    #[test]
    fn test_ron_config() {
        let config = SessionConfig::from_ron("(mode: off, seed: Some(7))").unwrap();
        assert_eq!(config.mode, DebugMode::Off);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn test_invalid_json_is_a_config_error() {
        let err = SessionConfig::from_json("{ mode: ").unwrap_err();
        assert!(matches!(err, TelemetryError::Config(_)));
    }

    #[test]
    fn test_off_mode_has_no_wrap_options() {
        assert!(SessionConfig::with_mode(DebugMode::Off)
            .wrap_options()
            .is_none());
        let options = SessionConfig::with_mode(DebugMode::Full)
            .wrap_options()
            .unwrap();
        assert!(options.track_binds && options.track_programs && options.track_instancing);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let config = SessionConfig {
            seed: Some(42),
            ..SessionConfig::with_mode(DebugMode::Full)
        };
        config.to_file(&path).unwrap();
        assert_eq!(SessionConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "mode = 'full'").unwrap();
        assert!(matches!(
            SessionConfig::from_file(&path),
            Err(TelemetryError::UnsupportedFormat { .. })
        ));
    }
}
