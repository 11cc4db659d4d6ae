//! Analytics API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

use tally_core::validation::validate_limit;
use tally_core::ReportPolicy;

/// Analytics API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server port
    pub http_port: u16,

    /// Address the listener binds to
    pub bind_addr: String,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// JWT secret key for validating dashboard sessions
    pub jwt_secret: String,

    /// Estimate ratios and the default window
    pub policy: ReportPolicy,

    /// Default size of the live activity feed
    pub activity_limit: i64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let config = AppConfig {
            http_port: parse_var("HTTP_PORT", 8080)?,

            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string()),

            database_path: env::var("TALLY_DB_PATH").unwrap_or_else(|_| "./tally.db".to_string()),

            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                // In production, this MUST be set via environment variable
                "tally-dev-secret-change-in-production".to_string()
            }),

            policy: ReportPolicy {
                estimated_cost_bps: parse_var(
                    "ANALYTICS_ESTIMATED_COST_BPS",
                    tally_core::DEFAULT_ESTIMATED_COST_BPS,
                )?,
                default_labour_bps: parse_var(
                    "ANALYTICS_DEFAULT_LABOUR_BPS",
                    tally_core::DEFAULT_LABOUR_BPS,
                )?,
                default_range_days: parse_var(
                    "ANALYTICS_DEFAULT_RANGE_DAYS",
                    tally_core::DEFAULT_RANGE_DAYS,
                )?,
            },

            activity_limit: parse_var("ANALYTICS_ACTIVITY_LIMIT", 50)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        for (name, bps) in [
            ("ANALYTICS_ESTIMATED_COST_BPS", self.policy.estimated_cost_bps),
            ("ANALYTICS_DEFAULT_LABOUR_BPS", self.policy.default_labour_bps),
        ] {
            if bps > 10_000 {
                return Err(ConfigError::InvalidValue(name.to_string()));
            }
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue("DB_MAX_CONNECTIONS".to_string()));
        }
        validate_limit(Some(self.activity_limit), self.activity_limit)
            .map_err(|_| ConfigError::InvalidValue("ANALYTICS_ACTIVITY_LIMIT".to_string()))?;
        Ok(())
    }

    /// `bind_addr:http_port`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.http_port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            http_port: 8080,
            bind_addr: "0.0.0.0".to_string(),
            database_path: "./tally.db".to_string(),
            db_max_connections: 5,
            jwt_secret: "tally-dev-secret-change-in-production".to_string(),
            policy: ReportPolicy::default(),
            activity_limit: 50,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.policy.estimated_cost_bps, 7_000);
    }

    #[test]
    fn test_ratio_above_one_rejected() {
        let mut config = AppConfig::default();
        config.policy.default_labour_bps = 12_000;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(name)) if name == "ANALYTICS_DEFAULT_LABOUR_BPS"));
    }

    #[test]
    fn test_activity_limit_bounds() {
        let mut config = AppConfig::default();
        config.activity_limit = 0;
        assert!(config.validate().is_err());
    }
}
