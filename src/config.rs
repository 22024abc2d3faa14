// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: SocketAddr,
    /// Base used when building activation links sent by mail.
    pub public_base_url: String,
    pub mail_from: String,
    /// When unset, outgoing mail is written to the log instead.
    pub mail_api_url: Option<String>,
    pub mail_api_token: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, treating empty values
    /// as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expiration = match get("JWT_EXPIRATION") {
            Some(value) => value.parse::<u64>().map_err(|_| ConfigError::Invalid {
                key: "JWT_EXPIRATION",
                value,
            })?,
            None => 3600,
        };

        let rust_log = get("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let bind_addr = match get("BIND_ADDR") {
            Some(value) => value
                .parse::<SocketAddr>()
                .map_err(|_| ConfigError::Invalid {
                    key: "BIND_ADDR",
                    value,
                })?,
            None => SocketAddr::from(([0, 0, 0, 0], 8000)),
        };

        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8000".to_string())
            .trim_end_matches('/')
            .to_string();
        if url::Url::parse(&public_base_url).is_err() {
            return Err(ConfigError::Invalid {
                key: "PUBLIC_BASE_URL",
                value: public_base_url,
            });
        }

        let mail_from =
            get("MAIL_FROM").unwrap_or_else(|| "ExamSim <noreply@examsim.local>".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            public_base_url,
            mail_from,
            mail_api_url: get("MAIL_API_URL"),
            mail_api_token: get("MAIL_API_TOKEN"),
            admin_email: get("ADMIN_EMAIL"),
            admin_password: get("ADMIN_PASSWORD"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_optional_keys_absent() {
        let config =
            Config::from_lookup(lookup(&[("DATABASE_URL", "sqlite::memory:"), ("JWT_SECRET", "s")]))
                .unwrap();

        assert_eq!(config.jwt_expiration, 3600);
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.public_base_url, "http://localhost:8000");
        assert!(config.mail_api_url.is_none());
        assert!(config.admin_email.is_none());
    }

    #[test]
    fn missing_secret_is_reported() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "sqlite::memory:")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn empty_values_count_as_missing() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "  "), ("JWT_SECRET", "s")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn invalid_expiration_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "s"),
            ("JWT_EXPIRATION", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "JWT_EXPIRATION", .. }));
    }

    #[test]
    fn trailing_slash_is_trimmed_from_base_url() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "s"),
            ("PUBLIC_BASE_URL", "https://exams.example.org/"),
        ]))
        .unwrap();
        assert_eq!(config.public_base_url, "https://exams.example.org");
    }
}
