//! Database connection configuration.
//!
//! Values come from the process environment, after loading a `.env` file if
//! one is present:
//!
//! | Variable                        | Default |
//! |---------------------------------|---------|
//! | `DATABASE_URL`                  | required |
//! | `DATABASE_MAX_CONNECTIONS`      | 100     |
//! | `DATABASE_MIN_CONNECTIONS`      | 0       |
//! | `DATABASE_ACQUIRE_TIMEOUT_SECS` | 30      |
//! | `DATABASE_IDLE_TIMEOUT_SECS`    | 600 (`0` disables) |
//! | `DATABASE_MAX_LIFETIME_SECS`    | 10 (`0` disables)  |

use std::borrow::Cow;
use std::time::Duration;

const DEFAULT_MAX_CONNECTIONS: u32 = 100;
const DEFAULT_MIN_CONNECTIONS: u32 = 0;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;
const DEFAULT_MAX_LIFETIME_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("unsupported database URL scheme: {0}")]
    UnsupportedBackend(String),
}

/// Database backend, derived from the connection URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    MySql,
    Sqlite,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let scheme = url.split_once(':').map_or(url, |(scheme, _)| scheme);
        match scheme.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "mysql" | "mariadb" => Ok(Backend::MySql),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(ConfigError::UnsupportedBackend(other.to_string())),
        }
    }

    /// Rewrite `?` placeholders into the backend's native syntax.
    ///
    /// Postgres numbers its parameters (`$1`, `$2`, ...). Question marks inside
    /// single-quoted literals are left alone.
    pub fn rewrite_placeholders<'a>(&self, sql: &'a str) -> Cow<'a, str> {
        if *self != Backend::Postgres || !sql.contains('?') {
            return Cow::Borrowed(sql);
        }

        let mut rewritten = String::with_capacity(sql.len() + 8);
        let mut in_literal = false;
        let mut index = 0;
        for ch in sql.chars() {
            match ch {
                '\'' => {
                    in_literal = !in_literal;
                    rewritten.push(ch);
                }
                '?' if !in_literal => {
                    index += 1;
                    rewritten.push('$');
                    rewritten.push_str(&index.to_string());
                }
                _ => rewritten.push(ch),
            }
        }
        Cow::Owned(rewritten)
    }
}

/// Connection string and pool sizing, consumed once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub backend: Backend,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl DatabaseConfig {
    /// Configuration with default pool settings for `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into();
        let backend = Backend::from_url(&url)?;
        Ok(Self {
            url,
            backend,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Some(Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)),
            max_lifetime: Some(Duration::from_secs(DEFAULT_MAX_LIFETIME_SECS)),
        })
    }

    /// Load from `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is fine; the variables may already be exported.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let mut config = Self::new(url)?;

        if let Some(value) = parse::<u32, _>(&lookup, "DATABASE_MAX_CONNECTIONS")? {
            config.max_connections = value;
        }
        if let Some(value) = parse::<u32, _>(&lookup, "DATABASE_MIN_CONNECTIONS")? {
            config.min_connections = value;
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "DATABASE_ACQUIRE_TIMEOUT_SECS")? {
            config.acquire_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "DATABASE_IDLE_TIMEOUT_SECS")? {
            config.idle_timeout = optional_duration(secs);
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "DATABASE_MAX_LIFETIME_SECS")? {
            config.max_lifetime = optional_duration(secs);
        }

        if config.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }
        if config.min_connections > config.max_connections {
            return Err(ConfigError::Invalid {
                key: "DATABASE_MIN_CONNECTIONS",
                value: config.min_connections.to_string(),
            });
        }
        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

fn optional_duration(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
