// src/config.rs
use std::net::IpAddr;

use thiserror::Error;

const MEMORY_URL_PREFIX: &str = "memory:";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Postgres { url: String, max_connections: u32 },
    /// `DATABASE_URL=memory:` keeps everything in process memory.
    InMemory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub store: StoreBackend,
    pub jwt_secret: String,
    pub cors_origin: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let store = if database_url.starts_with(MEMORY_URL_PREFIX) {
            StoreBackend::InMemory
        } else {
            StoreBackend::Postgres {
                url: database_url,
                max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 10)?,
            }
        };

        Ok(Self {
            host: parse_or("HOST", get("HOST"), IpAddr::from([127, 0, 0, 1]))?,
            port: parse_or("PORT", get("PORT"), 3000)?,
            store,
            jwt_secret: get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
            cors_origin: get("CORS_ORIGIN"),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
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
    fn defaults_apply_when_optional_vars_are_unset() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/stock"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.host, IpAddr::from([127, 0, 0, 1]));
        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origin, None);
        assert_eq!(
            config.store,
            StoreBackend::Postgres {
                url: "postgres://localhost/stock".into(),
                max_connections: 10,
            }
        );
    }

    #[test]
    fn memory_url_selects_in_memory_store() {
        let config = load(&[("DATABASE_URL", "memory:"), ("JWT_SECRET", "s"), ("PORT", "8080")]).unwrap();
        assert_eq!(config.store, StoreBackend::InMemory);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn required_vars_are_reported() {
        assert_eq!(load(&[("JWT_SECRET", "s")]), Err(ConfigError::Missing("DATABASE_URL")));
        assert_eq!(load(&[("DATABASE_URL", "memory:")]), Err(ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = load(&[("DATABASE_URL", "memory:"), ("JWT_SECRET", "s"), ("PORT", "http")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "PORT",
                value: "http".into(),
            }
        );
    }
}
