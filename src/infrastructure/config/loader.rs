use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".switchyard";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Model name for tier '{0}' cannot be empty")]
    EmptyModel(&'static str),

    #[error("Path '{0}' cannot be empty")]
    EmptyPath(&'static str),

    #[error("Invalid {0}: must be at least 1")]
    ZeroValue(&'static str),

    #[error("Invalid domain_confidence: {0}. Must be between 0.0 and 1.0")]
    InvalidConfidence(f32),

    #[error("Invalid {0} score: {1}. Must be between 0.0 and 10.0")]
    InvalidScore(&'static str, f32),

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
    /// 2. .switchyard/config.yaml
    /// 3. .switchyard/local.yaml (optional local overrides)
    /// 4. Environment variables (SWITCHYARD_* prefix, `__` separates nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(CONFIG_DIR)
    }

    /// Same as [`ConfigLoader::load`] but rooted at `dir`.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("SWITCHYARD_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
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
        let models = &config.models;
        for (tier, name) in [
            ("light", &models.light),
            ("standard", &models.standard),
            ("heavy", &models.heavy),
            ("expert", &models.expert),
        ] {
            if name.trim().is_empty() {
                return Err(ConfigError::EmptyModel(tier));
            }
        }

        let planner = &config.planner;
        if !(0.0..=1.0).contains(&planner.domain_confidence) {
            return Err(ConfigError::InvalidConfidence(planner.domain_confidence));
        }
        for (name, score) in [
            ("expert_min", planner.expert_min_score),
            ("complex_min", planner.complex_min_score),
        ] {
            if !(0.0..=10.0).contains(&score) {
                return Err(ConfigError::InvalidScore(name, score));
            }
        }

        if config.knowledge.entries_path.is_empty() {
            return Err(ConfigError::EmptyPath("knowledge.entries_path"));
        }
        if config.graph.path.is_empty() {
            return Err(ConfigError::EmptyPath("graph.path"));
        }
        if config.telemetry.task_log_path.is_empty() {
            return Err(ConfigError::EmptyPath("telemetry.task_log_path"));
        }

        for (name, value) in [
            ("knowledge.max_entries", config.knowledge.max_entries),
            ("knowledge.overfetch_factor", config.knowledge.overfetch_factor),
            ("reranker.coarse_multiplier", config.reranker.coarse_multiplier),
            ("llm.max_concurrency", config.llm.max_concurrency),
            ("embedding.max_concurrency", config.embedding.max_concurrency),
            ("embedding.dimension", config.embedding.dimension),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue(name));
            }
        }
        if config.llm.timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("llm.timeout_secs"));
        }
        if config.embedding.timeout_secs == 0 {
            return Err(ConfigError::ZeroValue("embedding.timeout_secs"));
        }

        if !(0.0..=10.0).contains(&config.reranker.neutral_score) {
            return Err(ConfigError::InvalidScore(
                "neutral",
                config.reranker.neutral_score,
            ));
        }

        if config.telemetry.fine_tune_high_priority_calls < config.telemetry.fine_tune_min_calls {
            return Err(ConfigError::ValidationFailed(format!(
                "telemetry.fine_tune_high_priority_calls ({}) must be >= fine_tune_min_calls ({})",
                config.telemetry.fine_tune_high_priority_calls,
                config.telemetry.fine_tune_min_calls
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
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const OVERRIDDEN_VARS: [&str; 2] = ["SWITCHYARD_LOGGING__LEVEL", "SWITCHYARD_MODELS__EXPERT"];

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        ConfigLoader::validate(&config).expect("Default config should be valid");
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
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_empty_model() {
        let mut config = Config::default();
        config.models.heavy = "  ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyModel("heavy")
        ));
    }

    #[test]
    fn test_validate_confidence_range() {
        let mut config = Config::default();
        config.planner.domain_confidence = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidConfidence(_)
        ));
    }

    #[test]
    fn test_validate_zero_concurrency() {
        let mut config = Config::default();
        config.llm.max_concurrency = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ZeroValue("llm.max_concurrency")
        ));
    }

    #[test]
    fn test_validate_fine_tune_thresholds() {
        let mut config = Config::default();
        config.telemetry.fine_tune_high_priority_calls = 10;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "models:\n  light: tiny\n  heavy: big\nlogging:\n  level: info\n  format: json\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("local.yaml"),
            "models:\n  heavy: bigger\nlogging:\n  level: debug\n",
        )
        .unwrap();

        temp_env::with_vars_unset(OVERRIDDEN_VARS, || {
            let config = ConfigLoader::load_from_dir(dir.path()).unwrap();
            assert_eq!(config.models.light, "tiny");
            assert_eq!(config.models.heavy, "bigger", "Local override should win");
            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.logging.format, "json", "Base value should persist");
            assert_eq!(config.models.expert, "deepseek-r1:70b");
        });
    }

    #[test]
    fn test_env_override() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.yaml"), "logging:\n  level: info\n").unwrap();

        temp_env::with_vars(
            [
                ("SWITCHYARD_LOGGING__LEVEL", Some("warn")),
                ("SWITCHYARD_MODELS__EXPERT", Some("o-large")),
            ],
            || {
                let config = ConfigLoader::load_from_dir(dir.path()).unwrap();
                assert_eq!(config.logging.level, "warn");
                assert_eq!(config.models.expert, "o-large");
            },
        );
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "logging:\n  format: xml\n").unwrap();
        assert!(ConfigLoader::load_from_file(&path).is_err());
    }

    #[test]
    fn test_missing_files_use_defaults() {
        let dir = TempDir::new().unwrap();
        temp_env::with_vars_unset(OVERRIDDEN_VARS, || {
            let config = ConfigLoader::load_from_dir(dir.path()).unwrap();
            assert_eq!(config.planner.long_message_chars, 300);
            assert_eq!(config.logging.level, "info");
        });
    }
}
