// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup into
//! [`Config`]. Nothing re-reads the environment afterwards; in particular
//! the test-auth switch cannot be flipped on a running process.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding `workmate.redb` | `./data` |
//! | `OIDC_JWKS_URL` | Identity provider JWKS endpoint | none |
//! | `OIDC_JWKS_FILE` | Static JWKS file (instead of the URL) | none |
//! | `OIDC_ISSUER` | Expected JWT issuer claim | not checked |
//! | `OIDC_JWKS_TIMEOUT_SECS` | JWKS fetch timeout | `5` |
//! | `OIDC_JWKS_TTL_SECS` | Key set cache lifetime | process lifetime |
//! | `OIDC_JWKS_REFETCH_ON_MISS` | Refetch once on unknown `kid` | `false` |
//! | `OIDC_LEEWAY_SECS` | Clock skew tolerance | `60` |
//! | `AUDIT_MAX_DETAILS_LEN` | Audit details cap (characters) | `4000` |
//! | `WORKMATE_TEST_AUTH` | Honour the `X-Test-User` header | `false` |
//! | `CORS_ORIGINS` | Comma-separated allowed origins | `http://localhost:5173` |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both enable HTTPS | none |
//! | `SEED_EMPLOYEES_FILE` | JSON array of employees to provision | none |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::audit::DEFAULT_MAX_DETAILS_LEN;
use crate::auth::jwks::DEFAULT_FETCH_TIMEOUT;
use crate::auth::verifier::DEFAULT_LEEWAY_SECS;
use crate::auth::RefreshPolicy;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the database directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Database file inside the data directory.
pub const DATABASE_FILE: &str = "workmate.redb";

pub const OIDC_JWKS_URL_ENV: &str = "OIDC_JWKS_URL";
pub const OIDC_JWKS_FILE_ENV: &str = "OIDC_JWKS_FILE";
pub const OIDC_ISSUER_ENV: &str = "OIDC_ISSUER";
pub const OIDC_JWKS_TIMEOUT_ENV: &str = "OIDC_JWKS_TIMEOUT_SECS";
pub const OIDC_JWKS_TTL_ENV: &str = "OIDC_JWKS_TTL_SECS";
pub const OIDC_JWKS_REFETCH_ENV: &str = "OIDC_JWKS_REFETCH_ON_MISS";
pub const OIDC_LEEWAY_ENV: &str = "OIDC_LEEWAY_SECS";

pub const AUDIT_MAX_DETAILS_ENV: &str = "AUDIT_MAX_DETAILS_LEN";

/// Enables the `X-Test-User` override. Never set in production.
pub const TEST_AUTH_ENV: &str = "WORKMATE_TEST_AUTH";

pub const CORS_ORIGINS_ENV: &str = "CORS_ORIGINS";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:5173";

pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";

pub const SEED_EMPLOYEES_ENV: &str = "SEED_EMPLOYEES_FILE";

pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Smallest details cap that still leaves room for the truncation marker.
const MIN_DETAILS_LEN: usize = 16;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),

    #[error("{0} and {1} are mutually exclusive")]
    Conflict(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

/// Where the identity provider's signing keys come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySetLocation {
    Url(url::Url),
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OidcConfig {
    pub keys: KeySetLocation,
    pub issuer: Option<String>,
    pub fetch_timeout: Duration,
    pub refresh: RefreshPolicy,
    pub leeway_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    /// `None` disables bearer authentication entirely.
    pub oidc: Option<OidcConfig>,
    pub audit_max_details_len: usize,
    pub test_auth: bool,
    pub cors_origins: Vec<String>,
    pub tls: Option<TlsPaths>,
    pub seed_employees: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse(PORT_ENV, get(PORT_ENV))?.unwrap_or(8080);
        let bind_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: HOST_ENV,
                value: host.clone(),
                reason: e.to_string(),
            })?;

        let oidc = oidc_config(&get)?;

        let audit_max_details_len =
            parse(AUDIT_MAX_DETAILS_ENV, get(AUDIT_MAX_DETAILS_ENV))?.unwrap_or(DEFAULT_MAX_DETAILS_LEN);
        if audit_max_details_len < MIN_DETAILS_LEN {
            return Err(ConfigError::Invalid {
                name: AUDIT_MAX_DETAILS_ENV,
                value: audit_max_details_len.to_string(),
                reason: format!("must be at least {MIN_DETAILS_LEN}"),
            });
        }

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete(TLS_CERT_PATH_ENV, TLS_KEY_PATH_ENV)),
        };

        let cors_origins = get(CORS_ORIGINS_ENV)
            .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        let log_format = match get(LOG_FORMAT_ENV).as_deref().map(str::to_lowercase).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    value: other.to_string(),
                    reason: "expected 'json' or 'pretty'".to_string(),
                })
            }
        };

        Ok(Self {
            bind_addr,
            data_dir: get(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            oidc,
            audit_max_details_len,
            test_auth: flag(TEST_AUTH_ENV, get(TEST_AUTH_ENV))?,
            cors_origins,
            tls,
            seed_employees: get(SEED_EMPLOYEES_ENV).map(PathBuf::from),
            log_format,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn oidc_config(get: &dyn Fn(&str) -> Option<String>) -> Result<Option<OidcConfig>, ConfigError> {
    let keys = match (get(OIDC_JWKS_URL_ENV), get(OIDC_JWKS_FILE_ENV)) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::Conflict(OIDC_JWKS_URL_ENV, OIDC_JWKS_FILE_ENV))
        }
        (Some(raw), None) => {
            let url = url::Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                name: OIDC_JWKS_URL_ENV,
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid {
                    name: OIDC_JWKS_URL_ENV,
                    value: raw,
                    reason: "expected an http(s) URL".to_string(),
                });
            }
            KeySetLocation::Url(url)
        }
        (None, Some(path)) => KeySetLocation::File(path.into()),
        (None, None) => return Ok(None),
    };

    let fetch_timeout = parse::<u64>(OIDC_JWKS_TIMEOUT_ENV, get(OIDC_JWKS_TIMEOUT_ENV))?
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_FETCH_TIMEOUT);
    let ttl = parse::<u64>(OIDC_JWKS_TTL_ENV, get(OIDC_JWKS_TTL_ENV))?.map(Duration::from_secs);

    Ok(Some(OidcConfig {
        keys,
        issuer: get(OIDC_ISSUER_ENV),
        fetch_timeout,
        refresh: RefreshPolicy {
            ttl,
            refetch_on_miss: flag(OIDC_JWKS_REFETCH_ENV, get(OIDC_JWKS_REFETCH_ENV))?,
        },
        leeway_secs: parse(OIDC_LEEWAY_ENV, get(OIDC_LEEWAY_ENV))?.unwrap_or(DEFAULT_LEEWAY_SECS),
    }))
}

fn parse<T>(name: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn flag(name: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_lowercase).as_deref() {
        None | Some("false" | "0" | "no") => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            name,
            value: other.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
