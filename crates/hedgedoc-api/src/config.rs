//! Server configuration loaded from the environment.
//!
//! Environment variables:
//!   DATABASE_URL        - PostgreSQL connection string
//!   HOST / PORT         - listen address
//!   BASE_URL            - public URL used to build media links
//!   MEDIA_BACKEND       - storage backend for uploads (only "filesystem")
//!   MEDIA_UPLOAD_PATH   - directory of the filesystem backend
//!   MAX_UPLOAD_BYTES    - request body limit
//!   DB_MAX_CONNECTIONS  - pool size

use std::path::PathBuf;

use thiserror::Error;

use hedgedoc_core::{defaults, BackendType};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unsupported media backend '{0}'")]
    UnknownBackend(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub media_backend: BackendType,
    pub media_upload_path: PathBuf,
    pub max_upload_bytes: usize,
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port = parse_number("PORT", lookup("PORT"), defaults::PORT)?;
        let max_upload_bytes = parse_number(
            "MAX_UPLOAD_BYTES",
            lookup("MAX_UPLOAD_BYTES"),
            defaults::MAX_UPLOAD_BYTES,
        )?;
        let db_max_connections = parse_number(
            "DB_MAX_CONNECTIONS",
            lookup("DB_MAX_CONNECTIONS"),
            defaults::DB_MAX_CONNECTIONS,
        )?;

        let backend_name = get("MEDIA_BACKEND", defaults::MEDIA_BACKEND);
        let media_backend = backend_name
            .parse::<BackendType>()
            .map_err(|_| ConfigError::UnknownBackend(backend_name.clone()))?;

        let base_url = get("BASE_URL", &format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            database_url: get("DATABASE_URL", defaults::DATABASE_URL),
            host: get("HOST", defaults::HOST),
            port,
            base_url,
            media_backend,
            media_upload_path: PathBuf::from(get("MEDIA_UPLOAD_PATH", defaults::MEDIA_UPLOAD_PATH)),
            max_upload_bytes,
            db_max_connections,
        })
    }
}

fn parse_number<T: std::str::FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        _ => Ok(default),
    }
}
