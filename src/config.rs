//! Runtime configuration read from the environment (and `.env` via dotenvy).

use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_PROVIDER_BASE_URL: &str = "https://fxds-public-exchange-rates-api.oanda.com/cc-api";
pub const DEFAULT_PROVIDER_NAME: &str = "OANDA";
pub const DEFAULT_PROVIDER_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_SYNC_CURRENCIES: &str = "USD,EUR,JPY,GBP";
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3600; // hourly

/// Width of the `source` column the provider name is stored in.
pub const MAX_PROVIDER_NAME_LEN: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub provider: ProviderConfig,
    pub sync: SyncConfig,
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    /// Source tag written on every rate this provider produces
    pub name: String,
    /// Applied to both connect and total request time
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub base_currencies: Vec<String>,
    pub quote_currencies: Vec<String>,
    /// Max pairs fetched at the same time
    pub concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let bind_addr = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let provider = ProviderConfig {
            base_url: get("QUOTE_PROVIDER_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PROVIDER_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            name: get("QUOTE_PROVIDER_NAME").unwrap_or_else(|| DEFAULT_PROVIDER_NAME.to_string()),
            request_timeout: Duration::from_millis(parse_number(
                "QUOTE_PROVIDER_TIMEOUT_MS",
                get("QUOTE_PROVIDER_TIMEOUT_MS"),
                DEFAULT_PROVIDER_TIMEOUT_MS,
            )?),
        };

        if provider.request_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: "QUOTE_PROVIDER_TIMEOUT_MS",
                reason: "must be greater than 0".to_string(),
            });
        }

        if provider.name.chars().count() > MAX_PROVIDER_NAME_LEN {
            return Err(ConfigError::Invalid {
                key: "QUOTE_PROVIDER_NAME",
                reason: format!("must be at most {} characters", MAX_PROVIDER_NAME_LEN),
            });
        }

        let sync = SyncConfig {
            base_currencies: parse_currency_list(
                "SYNC_BASE_CURRENCIES",
                &get("SYNC_BASE_CURRENCIES").unwrap_or_else(|| DEFAULT_SYNC_CURRENCIES.to_string()),
            )?,
            quote_currencies: parse_currency_list(
                "SYNC_QUOTE_CURRENCIES",
                &get("SYNC_QUOTE_CURRENCIES").unwrap_or_else(|| DEFAULT_SYNC_CURRENCIES.to_string()),
            )?,
            concurrency: parse_number("SYNC_CONCURRENCY", get("SYNC_CONCURRENCY"), 1)?,
        };

        if sync.concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "SYNC_CONCURRENCY",
                reason: "must be at least 1".to_string(),
            });
        }

        let scheduler = SchedulerConfig {
            enabled: parse_bool("SYNC_SCHEDULER_ENABLED", get("SYNC_SCHEDULER_ENABLED"), true)?,
            interval: Duration::from_secs(parse_number(
                "SYNC_INTERVAL_SECS",
                get("SYNC_INTERVAL_SECS"),
                DEFAULT_SYNC_INTERVAL_SECS,
            )?),
        };

        if scheduler.interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "SYNC_INTERVAL_SECS",
                reason: "must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            database_url,
            bind_addr,
            provider,
            sync,
            scheduler,
        })
    }
}

/// Parse a comma separated list of ISO codes into an ordered set.
///
/// Codes are upper-cased; repeats keep their first position.
pub fn parse_currency_list(key: &'static str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let mut codes: Vec<String> = Vec::new();

    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let code = part.to_uppercase();
        if !is_iso_code(&code) {
            return Err(ConfigError::Invalid {
                key,
                reason: format!("'{}' is not a 3-letter currency code", part),
            });
        }
        if !codes.contains(&code) {
            codes.push(code);
        }
    }

    if codes.is_empty() {
        return Err(ConfigError::Invalid {
            key,
            reason: "at least one currency code is required".to_string(),
        });
    }

    Ok(codes)
}

pub fn is_iso_code(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

fn parse_number<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

fn parse_bool(key: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(ConfigError::Invalid {
                key,
                reason: format!("'{}' is not a boolean", other),
            }),
        },
    }
}
