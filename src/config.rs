use std::{env, net::SocketAddr, path::PathBuf};

use thiserror::Error;

use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_MAX_CONNECTIONS, DEFAULT_MEDIA_ROOT,
    DEFAULT_SESSION_LIFETIME_HOURS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub session_lifetime_hours: i64,
    pub media_root: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            bind_address: parse_or(&lookup, "BIND_ADDRESS", DEFAULT_BIND_ADDRESS)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            jwt_secret,
            session_lifetime_hours: parse_or(
                &lookup,
                "SESSION_LIFETIME_HOURS",
                DEFAULT_SESSION_LIFETIME_HOURS,
            )?,
            media_root: lookup("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MEDIA_ROOT)),
        })
    }
}

fn parse_or<F, T, D>(lookup: &F, key: &'static str, default: D) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    D: ToString,
{
    let value = lookup(key).unwrap_or_else(|| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { key, value })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.bind_address.port(), 8000);
        assert_eq!(config.database_url, None);
        assert_eq!(config.max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(config.session_lifetime_hours, DEFAULT_SESSION_LIFETIME_HOURS);
        assert_eq!(config.media_root, PathBuf::from(DEFAULT_MEDIA_ROOT));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn unparseable_values_are_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]))
        .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                ..
            }
        ));
    }
}
