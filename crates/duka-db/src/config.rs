//! # Application Configuration
//!
//! Settings loaded at startup from `DUKA_*` environment variables with
//! fallback to defaults.
//!
//! ## Variables
//! ```text
//! ┌─────────────────────────┬──────────────────┬────────────────────────────┐
//! │ Variable                │ Default          │ Meaning                    │
//! ├─────────────────────────┼──────────────────┼────────────────────────────┤
//! │ DUKA_DB_PATH            │ ./duka.db        │ SQLite file                │
//! │ DUKA_VAT_RATE           │ 16               │ VAT percent, e.g. "16"     │
//! │ DUKA_MAX_OVERPAYMENT    │ 20               │ percent, "none" disables   │
//! │ DUKA_CREDIT_TERM_DAYS   │ (unset)          │ debt due date offset       │
//! │ DUKA_PRICE_LIST         │ (unset)          │ tag for suspended sales    │
//! └─────────────────────────┴──────────────────┴────────────────────────────┘
//! ```
//!
//! Configuration is read-only after loading.

use std::env;
use std::path::PathBuf;

use duka_core::{CheckoutPolicy, TaxRate};
use thiserror::Error;

use crate::pool::DbConfig;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Everything a till needs to start.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub policy: CheckoutPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("./duka.db"),
            policy: CheckoutPolicy::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(path) = get("DUKA_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(rate) = get("DUKA_VAT_RATE") {
            let pct = parse_percent("DUKA_VAT_RATE", &rate)?;
            config.policy.vat_rate = TaxRate::from_percentage(pct);
        }

        if let Some(limit) = get("DUKA_MAX_OVERPAYMENT") {
            config.policy.max_overpayment_bps = if limit.eq_ignore_ascii_case("none") {
                None
            } else {
                let pct = parse_percent("DUKA_MAX_OVERPAYMENT", &limit)?;
                Some(TaxRate::from_percentage(pct).bps())
            };
        }

        if let Some(days) = get("DUKA_CREDIT_TERM_DAYS") {
            let parsed: i64 = days.parse().map_err(|_| invalid("DUKA_CREDIT_TERM_DAYS", &days))?;
            if parsed < 0 {
                return Err(invalid("DUKA_CREDIT_TERM_DAYS", &days));
            }
            config.policy.credit_term_days = Some(parsed);
        }

        config.policy.price_list = get("DUKA_PRICE_LIST");

        Ok(config)
    }

    /// Database settings for this configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path.clone())
    }
}

fn parse_percent(key: &str, value: &str) -> Result<f64, ConfigError> {
    let pct: f64 = value.parse().map_err(|_| invalid(key, value))?;
    if !(0.0..=100.0).contains(&pct) {
        return Err(invalid(key, value));
    }
    Ok(pct)
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./duka.db"));
        assert_eq!(config.policy.vat_rate.bps(), 1600);
        assert_eq!(config.policy.max_overpayment_bps, Some(2000));
        assert_eq!(config.policy.credit_term_days, None);
        assert_eq!(config.policy.price_list, None);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DUKA_DB_PATH", "/var/lib/duka/till.db"),
            ("DUKA_VAT_RATE", "8"),
            ("DUKA_MAX_OVERPAYMENT", "none"),
            ("DUKA_CREDIT_TERM_DAYS", "30"),
            ("DUKA_PRICE_LIST", "wholesale"),
        ])
        .unwrap();

        assert_eq!(config.db_config().database_path, PathBuf::from("/var/lib/duka/till.db"));
        assert_eq!(config.policy.vat_rate.bps(), 800);
        assert_eq!(config.policy.max_overpayment_bps, None);
        assert_eq!(config.policy.credit_term_days, Some(30));
        assert_eq!(config.policy.price_list.as_deref(), Some("wholesale"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("DUKA_VAT_RATE", "sixteen")]).is_err());
        assert!(load(&[("DUKA_VAT_RATE", "150")]).is_err());
        assert!(load(&[("DUKA_CREDIT_TERM_DAYS", "-3")]).is_err());
        assert!(load(&[("DUKA_MAX_OVERPAYMENT", "abc")]).is_err());
    }
}
