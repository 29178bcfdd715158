use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ChaindError, Result};

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const ENV_PREFIX: &str = "CHAIND_";

/// Top-level config (chaind.toml + CHAIND_* env overrides).
///
/// Every section is optional; a missing file yields the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChaindConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, used when `RUST_LOG` is unset or invalid.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Scheduler service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Report job counters through the `metrics` facade (default: true).
    /// Override with env var: CHAIND_SCHEDULER__METRICS=false
    #[serde(default = "bool_true")]
    pub metrics: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { metrics: true }
    }
}

fn bool_true() -> bool {
    true
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl ChaindConfig {
    /// Load config from a TOML file with CHAIND_* env var overrides.
    ///
    /// Nested keys use a double underscore, e.g. `CHAIND_LOGGING__LEVEL=debug`.
    /// Without an explicit path `~/.chaind/chaind.toml` is read.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ChaindError::Config(e.to_string()))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.chaind/chaind.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let config = ChaindConfig::load(Some("absent.toml")).expect("defaults");
            assert_eq!(config.logging.level, DEFAULT_LOG_LEVEL);
            assert_eq!(config.logging.format, LogFormat::Pretty);
            assert!(config.scheduler.metrics);
            Ok(())
        });
    }

    #[test]
    fn file_and_env_are_merged() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "chaind.toml",
                r#"
                [logging]
                level = "warn"
                format = "json"

                [scheduler]
                metrics = false
                "#,
            )?;
            jail.set_env("CHAIND_LOGGING__LEVEL", "debug");

            let config = ChaindConfig::load(Some("chaind.toml")).expect("config");
            assert_eq!(config.logging.level, "debug");
            assert_eq!(config.logging.format, LogFormat::Json);
            assert!(!config.scheduler.metrics);
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        Jail::expect_with(|jail| {
            jail.create_file("chaind.toml", "[scheduler]\nmetrics = \"sometimes\"")?;
            let err = ChaindConfig::load(Some("chaind.toml")).unwrap_err();
            assert_eq!(err.code(), "CONFIG_ERROR");
            Ok(())
        });
    }
}
