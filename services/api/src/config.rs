//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;

use results_portal_core::import::DEFAULT_BATCH_SIZE;
use results_portal_core::{ImportOptions, ValidationPolicy};
use tracing::Level;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
    pub import: ImportOptions,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address_str =
            lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Load Import Settings ---
        let max_upload_bytes =
            positive(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let batch_size = positive(&lookup, "IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE)?;

        let policy_str =
            lookup("IMPORT_VALIDATION_POLICY").unwrap_or_else(|| "abort".to_string());
        let validation_policy = match policy_str.trim().to_lowercase().as_str() {
            "abort" => ValidationPolicy::AbortOnAnyError,
            "skip" => ValidationPolicy::SkipInvalidRows,
            other => {
                return Err(ConfigError::InvalidValue(
                    "IMPORT_VALIDATION_POLICY".to_string(),
                    format!("'{}' is not one of abort, skip", other),
                ))
            }
        };

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            max_upload_bytes,
            import: ImportOptions {
                batch_size,
                validation_policy,
            },
        })
    }
}

fn positive<F>(lookup: &F, key: &str, default: usize) -> Result<usize, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::InvalidValue(
            key.to_string(),
            format!("'{}' is not a positive integer", raw),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/results")]).unwrap();

        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.import.batch_size, 50);
        assert_eq!(
            config.import.validation_policy,
            ValidationPolicy::AbortOnAnyError
        );
    }

    #[test]
    fn database_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(v)) if v == "DATABASE_URL"));
    }

    #[test]
    fn import_settings_are_read_and_checked() {
        let config = load(&[
            ("DATABASE_URL", "postgres://db"),
            ("IMPORT_BATCH_SIZE", "10"),
            ("IMPORT_VALIDATION_POLICY", "Skip"),
        ])
        .unwrap();
        assert_eq!(config.import.batch_size, 10);
        assert_eq!(
            config.import.validation_policy,
            ValidationPolicy::SkipInvalidRows
        );

        for (key, value) in [
            ("IMPORT_BATCH_SIZE", "0"),
            ("IMPORT_VALIDATION_POLICY", "maybe"),
            ("BIND_ADDRESS", "nowhere"),
        ] {
            let err = load(&[("DATABASE_URL", "postgres://db"), (key, value)]).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(k, _) if k == key));
        }
    }
}
