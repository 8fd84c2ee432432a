//! Transpose configuration system
//!
//! Loads engine and stage settings from `transpose.toml`, with `TRANSPOSE_*`
//! environment variables as overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "transpose.toml";

/// Errors raised while loading a config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct TransposeConfig {
    /// Animation engine settings
    pub engine: EngineSettings,
    /// Stage behaviour settings
    pub stage: StageSettings,
}

/// Animation engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Snap every action to its target and complete after `snap_settle_ms`
    pub snap: bool,
    /// Settle time of snapped actions in milliseconds
    pub snap_settle_ms: f32,
    /// Frame step used when advancing the engine in bulk
    pub frame_ms: f32,
    /// Tween duration when a transition does not set one
    pub default_duration_ms: f32,
    /// Easing name when a tween does not set one (`ease_out`, `linear`, ...)
    pub default_easing: String,
}

/// Stage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct StageSettings {
    /// Animate elements on the stage's first render as well
    pub animate_first: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            snap: false,
            snap_settle_ms: 10.0,
            frame_ms: 16.0,
            default_duration_ms: 300.0,
            default_easing: "ease_out".to_string(),
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

impl TransposeConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from `transpose.toml` in the current directory
    /// or return default configuration if the file doesn't exist
    pub fn load_or_default() -> Self {
        Self::load_from_file(CONFIG_FILE).unwrap_or_default()
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) {
        self.merge_with(|key| std::env::var(key).ok());
    }

    /// Merge overrides from an arbitrary key lookup
    pub fn merge_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Engine settings
        if let Some(val) = lookup("TRANSPOSE_SNAP") {
            self.engine.snap = parse_flag(&val);
        }
        if let Some(val) = lookup("TRANSPOSE_SNAP_SETTLE_MS") {
            if let Ok(ms) = val.parse::<f32>() {
                self.engine.snap_settle_ms = ms;
            }
        }
        if let Some(val) = lookup("TRANSPOSE_DURATION_MS") {
            if let Ok(ms) = val.parse::<f32>() {
                self.engine.default_duration_ms = ms;
            }
        }
        if let Some(easing) = lookup("TRANSPOSE_EASING") {
            self.engine.default_easing = easing;
        }

        // Stage settings
        if let Some(val) = lookup("TRANSPOSE_ANIMATE_FIRST") {
            self.stage.animate_first = parse_flag(&val);
        }
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from transpose.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    pub fn load() -> Self {
        let mut config = Self::load_or_default();
        config.merge_with_env();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TransposeConfig::default();
        assert!(!config.engine.snap);
        assert_eq!(config.engine.snap_settle_ms, 10.0);
        assert_eq!(config.engine.default_easing, "ease_out");
        assert!(!config.stage.animate_first);
    }

    #[test]
    fn test_toml_serialization() {
        let config = TransposeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: TransposeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: TransposeConfig = toml::from_str(
            r#"
            [engine]
            snap = true
            "#,
        )
        .unwrap();
        assert!(parsed.engine.snap);
        assert_eq!(parsed.engine.frame_ms, 16.0);
    }

    #[test]
    fn test_load_or_default() {
        // Should not panic even if transpose.toml doesn't exist
        let config = TransposeConfig::load_or_default();
        assert!(config.engine.frame_ms > 0.0);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = TransposeConfig::load_from_file("does/not/exist.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("does/not/exist.toml"));
    }

    #[test]
    fn test_merge_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TRANSPOSE_SNAP", "1"),
            ("TRANSPOSE_SNAP_SETTLE_MS", "25"),
            ("TRANSPOSE_DURATION_MS", "not-a-number"),
            ("TRANSPOSE_EASING", "linear"),
            ("TRANSPOSE_ANIMATE_FIRST", "true"),
        ]
        .into_iter()
        .collect();

        let mut config = TransposeConfig::default();
        config.merge_with(|key| vars.get(key).map(|v| v.to_string()));

        assert!(config.engine.snap);
        assert_eq!(config.engine.snap_settle_ms, 25.0);
        assert_eq!(config.engine.default_duration_ms, 300.0);
        assert_eq!(config.engine.default_easing, "linear");
        assert!(config.stage.animate_first);
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("TRANSPOSE_EASING", "circ_in");
        }

        let mut config = TransposeConfig::default();
        config.merge_with_env();
        assert_eq!(config.engine.default_easing, "circ_in");

        unsafe {
            std::env::remove_var("TRANSPOSE_EASING");
        }
    }
}
