//! Analysis configuration
//!
//! Every tunable of the pipeline lives in one TOML document. Each section is
//! owned by the module that consumes it and every field has a default, so a
//! config file only needs to name what it changes.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::asymmetry::RomNorms;
use crate::calibration::CalibrationConfig;
use crate::error::{ConfigError, Result};
use crate::metrics::MetricsConfig;
use crate::scoring::ScoringConfig;
use crate::session::SessionConfig;
use crate::smoothing::SmoothingConfig;

/// Main analysis configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Visibility gate and physical scaling
    pub metrics: MetricsConfig,

    /// Warm-up calibration
    pub calibration: CalibrationConfig,

    /// Temporal smoothing
    pub smoothing: SmoothingConfig,

    /// Scoring curves, weights and grade bands
    pub scoring: ScoringConfig,

    /// Normal range of motion per joint
    pub rom: RomNorms,

    /// Exercise session timing
    pub session: SessionConfig,
}

impl AnalysisConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }
        let content = fs::read_to_string(path)?;
        Self::load_from_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn load_from_str(content: &str) -> Result<Self> {
        let config: AnalysisConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_content = toml::to_string_pretty(self)?;
        fs::write(&path, toml_content)?;
        Ok(())
    }

    /// Per-user config location
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("posturers")
            .join("config.toml")
    }

    /// Load the per-user config, falling back to defaults if it is missing
    /// or unreadable
    pub fn load_or_default() -> Self {
        let path = Self::default_config_path();
        match Self::load_from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Using default analysis config");
                Self::default()
            }
        }
    }

    /// Check every section; the first invalid value is reported
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        self.metrics.validate()?;
        self.calibration.validate()?;
        self.smoothing.validate()?;
        self.scoring.validate()?;
        self.rom.validate()?;
        self.session.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_serialization() {
        let config = AnalysisConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: AnalysisConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = AnalysisConfig::load_from_str(
            r#"
            [smoothing]
            window_size = 8

            [calibration]
            max_std_dev = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.smoothing.window_size, 8);
        assert_eq!(config.calibration.max_std_dev, 0.5);
        assert_eq!(config.calibration.min_samples, 10);
        assert_eq!(config.metrics.visibility_threshold, 0.5);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let err = AnalysisConfig::load_from_str("[smoothing]\nwindow_size = 0\n").unwrap_err();
        assert!(err.to_string().contains("smoothing.window_size"));
    }

    #[test]
    fn test_config_file_io() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = AnalysisConfig::default();
        config.metrics.reference_shoulder_width_cm = 36.0;
        config.save_to_file(&config_path).unwrap();

        let loaded = AnalysisConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.metrics.reference_shoulder_width_cm, 36.0);
    }

    #[test]
    fn test_missing_file() {
        let err = AnalysisConfig::load_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(
            err,
            crate::error::PostureError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
