//! Process settings read from the environment (and `.env` via dotenvy).

use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND: &str = "0.0.0.0:3000";
pub const DEFAULT_SCHEMA: &str = "trasy";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;
pub const DEFAULT_MEDIA_ROOT: &str = "media";

/// Which [`crate::store`] backend the server runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub bind: SocketAddr,
    pub store: StoreKind,
    /// Required for [`StoreKind::Postgres`].
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub schema: String,
    pub body_limit: usize,
    /// Directory served under `/media/` (background images).
    pub media_root: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("TRASY_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            key: "TRASY_BIND",
            message: format!("{}: {}", bind_raw, e),
        })?;

        let store = match get("TRASY_STORE").as_deref() {
            None | Some("postgres") => StoreKind::Postgres,
            Some("memory") => StoreKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "TRASY_STORE",
                    message: format!("expected postgres or memory, got {}", other),
                })
            }
        };

        let database_url = get("DATABASE_URL");
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let max_connections = parse_number(
            "TRASY_MAX_CONNECTIONS",
            get("TRASY_MAX_CONNECTIONS"),
            DEFAULT_MAX_CONNECTIONS,
        )?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "TRASY_MAX_CONNECTIONS",
                message: "must be at least 1".into(),
            });
        }

        let schema = get("TRASY_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        validate_identifier("TRASY_SCHEMA", &schema)?;

        let body_limit = parse_number("TRASY_BODY_LIMIT", get("TRASY_BODY_LIMIT"), DEFAULT_BODY_LIMIT)?;
        let media_root = PathBuf::from(get("TRASY_MEDIA_ROOT").unwrap_or_else(|| DEFAULT_MEDIA_ROOT.to_string()));

        Ok(Settings {
            bind,
            store,
            database_url,
            max_connections,
            schema,
            body_limit,
            media_root,
        })
    }
}

fn parse_number<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            message: format!("{}: {}", raw, e),
        }),
    }
}

static SQL_IDENTIFIER: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$"));

/// The schema name is spliced into SQL, so only plain identifiers pass.
fn validate_identifier(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let re = SQL_IDENTIFIER.as_ref().map_err(|e| ConfigError::Invalid {
        key,
        message: e.to_string(),
    })?;
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            key,
            message: format!("{} is not a lowercase SQL identifier", value),
        })
    }
}
