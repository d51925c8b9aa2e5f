use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::parse_frequency;

/// Project-local config directory.
pub const CONFIG_DIR: &str = ".edgewise";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {name}: {value}. Must be between 0 and 1")]
    InvalidFraction { name: &'static str, value: f64 },

    #[error(
        "Invalid auto bounds: auto_invalidate_confidence ({0}) must be below auto_validate_confidence ({1})"
    )]
    InvertedAutoBounds(f64, f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Invalid tick_interval_secs: {0}. Must be at least 1")]
    InvalidTickInterval(u64),

    #[error(
        "Invalid urgency bounds: medium_urgency ({0}) must not exceed high_urgency ({1}), and both must be at most 100"
    )]
    InvalidUrgencyBounds(u8, u8),

    #[error("State directory cannot be empty")]
    EmptyStateDir,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .edgewise/config.yaml (project config, created by init)
    /// 3. .edgewise/local.yaml (project local overrides, optional)
    /// 4. Environment variables (EDGEWISE_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Self::figment()
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(format!("{CONFIG_DIR}/config.yaml")))
            .merge(Yaml::file(format!("{CONFIG_DIR}/local.yaml")))
            .merge(Env::prefixed("EDGEWISE_").split("__"))
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("EDGEWISE_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.state_dir.trim().is_empty() {
            return Err(ConfigError::EmptyStateDir);
        }

        let h = &config.hypothesis;
        for (name, value) in [
            ("initial_confidence", h.initial_confidence),
            ("validation_confidence", h.validation_confidence),
            ("validation_win_rate", h.validation_win_rate),
            ("invalidation_confidence", h.invalidation_confidence),
            ("invalidation_win_rate", h.invalidation_win_rate),
            ("auto_invalidate_confidence", h.auto_invalidate_confidence),
            ("auto_validate_confidence", h.auto_validate_confidence),
            ("closed_trade_confidence_delta", h.closed_trade_confidence_delta),
            ("low_confidence", config.detectors.stuck.low_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidFraction { name, value });
            }
        }
        if h.auto_invalidate_confidence >= h.auto_validate_confidence {
            return Err(ConfigError::InvertedAutoBounds(
                h.auto_invalidate_confidence,
                h.auto_validate_confidence,
            ));
        }

        let s = &config.scheduler;
        if s.tick_interval_secs == 0 {
            return Err(ConfigError::InvalidTickInterval(s.tick_interval_secs));
        }
        if s.medium_urgency > s.high_urgency || s.high_urgency > 100 {
            return Err(ConfigError::InvalidUrgencyBounds(s.medium_urgency, s.high_urgency));
        }
        if parse_frequency(&s.default_frequency).is_none() {
            return Err(ConfigError::ValidationFailed(format!(
                "default_frequency '{}' is not a valid frequency",
                s.default_frequency
            )));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        for pipeline in &config.pipelines {
            if pipeline.name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Pipeline name cannot be empty".to_string(),
                ));
            }
            if pipeline.command.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(format!(
                    "Pipeline '{}' command cannot be empty",
                    pipeline.name
                )));
            }
        }

        for duty in &config.responsibilities {
            if duty.role.trim().is_empty() || duty.name.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "Responsibility role and name cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::PipelineConfig;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!((config.hypothesis.validation_confidence - 0.55).abs() < f64::EPSILON);
        assert_eq!(config.hypothesis.min_sample_size, 5);
        assert_eq!(config.scheduler.tick_interval_secs, 300);
        assert_eq!(config.state_dir, ".edgewise/state");
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
state_dir: /var/lib/edgewise
hypothesis:
  validation_confidence: 0.6
detectors:
  portfolio:
    critical_loss_pct: -30.0
scheduler:
  tick_interval_secs: 60
pipelines:
  - name: health-check
    command: ./scripts/health.sh
    frequency: 12h
    priority: high
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.state_dir, "/var/lib/edgewise");
        assert!((config.hypothesis.validation_confidence - 0.6).abs() < f64::EPSILON);
        assert!((config.hypothesis.validation_win_rate - 0.5).abs() < f64::EPSILON);
        assert!((config.detectors.portfolio.critical_loss_pct + 30.0).abs() < f64::EPSILON);
        assert!((config.detectors.portfolio.warning_loss_pct + 15.0).abs() < f64::EPSILON);
        assert_eq!(config.scheduler.tick_interval_secs, 60);
        assert_eq!(config.pipelines.len(), 1);
        assert_eq!(config.pipelines[0].frequency, "12h");
        assert_eq!(config.logging.format, "json");

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_fraction_out_of_range() {
        let mut config = Config::default();
        config.hypothesis.validation_win_rate = 1.5;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidFraction {
                name: "validation_win_rate",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_inverted_auto_bounds() {
        let mut config = Config::default();
        config.hypothesis.auto_invalidate_confidence = 0.8;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvertedAutoBounds(..)
        ));
    }

    #[test]
    fn test_validate_zero_tick_interval() {
        let mut config = Config::default();
        config.scheduler.tick_interval_secs = 0;

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidTickInterval(0)
        ));
    }

    #[test]
    fn test_validate_out_of_range_default_frequency() {
        let mut config = Config::default();
        config.scheduler.default_frequency = "999999999999d".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_empty_pipeline_command() {
        let mut config = Config::default();
        config.pipelines.push(PipelineConfig {
            name: "scan".to_string(),
            command: " ".to_string(),
            args: vec![],
            frequency: "1h".to_string(),
            priority: Default::default(),
        });

        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_env_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "scheduler:\n  tick_interval_secs: 60\n").unwrap();

        temp_env::with_vars(
            [
                ("EDGEWISE_SCHEDULER__TICK_INTERVAL_SECS", Some("30")),
                ("EDGEWISE_LOGGING__LEVEL", Some("debug")),
            ],
            || {
                let config = ConfigLoader::load_from_file(&path).unwrap();
                assert_eq!(config.scheduler.tick_interval_secs, 30);
                assert_eq!(config.logging.level, "debug");
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "scheduler:\n  tick_interval_secs: 120\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "scheduler:\n  tick_interval_secs: 15\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.scheduler.tick_interval_secs, 15, "Override should win");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(
            config.logging.format, "json",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.scheduler.high_urgency, 70, "Defaults fill the rest");
    }
}
