//! Server configuration.
//!
//! A [`Config`] is built once at startup, from the environment or by hand in
//! tests, and then shared read-only behind an `Arc`.
//!
//! | variable | default |
//! |---|---|
//! | `PIXEL_BIND_ADDR` | `0.0.0.0:8082` |
//! | `PIXEL_READ_TIMEOUT_SECS` | `20` |
//! | `PIXEL_MAX_BODY_BYTES` | `5242880` |
//! | `PIXEL_LOG_LEVEL` | `info` |
//! | `PIXEL_ACCESS_SECRET` | required |
//! | `PIXEL_REFRESH_SECRET` | required |
//! | `PIXEL_ACCESS_TTL_SECS` | `86400` |
//! | `PIXEL_REFRESH_TTL_SECS` | `1209600` |
//! | `PIXEL_OTP_TTL_SECS` | `300` |
//! | `PIXEL_LOCKOUT_BASE_SECS` | `60` |
//! | `PIXEL_AVATARS_DIR` | `media/images/avatars` |

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, Level};

use crate::lockout::Schedule;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required variable {key}")]
    Missing { key: String },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn missing<S: ToString>(key: S) -> Self {
        Self::Missing { key: key.to_string() }
    }

    pub fn invalid<S: ToString, R: ToString>(key: S, reason: R) -> Self {
        Self::Invalid { key: key.to_string(), reason: reason.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    pub auth: AuthConfig,

    #[serde(default)]
    pub lockout: LockoutConfig,

    #[serde(default)]
    pub otp: OtpConfig,

    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (default: 0.0.0.0:8082)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Time allowed for reading one request (default: 20s)
    #[serde(default = "default_read_timeout")]
    pub read_timeout: Duration,

    /// Largest accepted request body (default: 5 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,

    /// Lifetime of access tokens (default: 24h)
    #[serde(default = "default_access_ttl")]
    pub access_ttl: Duration,

    /// Lifetime of refresh tokens (default: 14 days)
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockoutConfig {
    #[serde(default = "default_login_schedule")]
    pub login: Schedule,

    #[serde(default = "default_secret_schedule")]
    pub otp: Schedule,

    #[serde(default = "default_secret_schedule")]
    pub reset: Schedule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// Lifetime of activation codes and reset tokens (default: 5 minutes)
    #[serde(default = "default_code_ttl")]
    pub code_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_avatars_dir")]
    pub avatars_dir: PathBuf,
}

impl Config {
    /// A configuration with the given secrets and every other value at its
    /// default.
    pub fn with_secrets(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::new(access_secret, refresh_secret),
            lockout: LockoutConfig::default(),
            otp: OtpConfig::default(),
            media: MediaConfig::default(),
        }
    }

    /// Loads `.env` when present, then reads the `PIXEL_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded environment file"),
            Err(e) => debug!(cause = %e, "no environment file loaded"),
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).filter(|value| !value.is_empty()).ok_or_else(|| ConfigError::missing(key));

        let log_level = lookup("PIXEL_LOG_LEVEL").unwrap_or_else(default_log_level);
        log_level.parse::<Level>().map_err(|e| ConfigError::invalid("PIXEL_LOG_LEVEL", e))?;

        let lockout_base = Duration::from_secs(parse(&lookup, "PIXEL_LOCKOUT_BASE_SECS", 60)?);

        Ok(Self {
            server: ServerConfig {
                bind_addr: lookup("PIXEL_BIND_ADDR").unwrap_or_else(default_bind_addr),
                read_timeout: secs(&lookup, "PIXEL_READ_TIMEOUT_SECS", default_read_timeout())?,
                max_body_bytes: parse(&lookup, "PIXEL_MAX_BODY_BYTES", default_max_body_bytes())?,
                log_level,
            },
            auth: AuthConfig {
                access_secret: required("PIXEL_ACCESS_SECRET")?,
                refresh_secret: required("PIXEL_REFRESH_SECRET")?,
                access_ttl: secs(&lookup, "PIXEL_ACCESS_TTL_SECS", default_access_ttl())?,
                refresh_ttl: secs(&lookup, "PIXEL_REFRESH_TTL_SECS", default_refresh_ttl())?,
            },
            lockout: LockoutConfig {
                login: Schedule::login(lockout_base),
                otp: Schedule::one_time_secret(lockout_base),
                reset: Schedule::one_time_secret(lockout_base),
            },
            otp: OtpConfig { code_ttl: secs(&lookup, "PIXEL_OTP_TTL_SECS", default_code_ttl())? },
            media: MediaConfig { avatars_dir: lookup("PIXEL_AVATARS_DIR").map_or_else(default_avatars_dir, PathBuf::from) },
        })
    }
}

impl ServerConfig {
    /// The configured log level, `INFO` when it does not parse.
    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}

impl AuthConfig {
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: default_access_ttl(),
            refresh_ttl: default_refresh_ttl(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            read_timeout: default_read_timeout(),
            max_body_bytes: default_max_body_bytes(),
            log_level: default_log_level(),
        }
    }
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self { login: default_login_schedule(), otp: default_secret_schedule(), reset: default_secret_schedule() }
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self { code_ttl: default_code_ttl() }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self { avatars_dir: default_avatars_dir() }
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e| ConfigError::invalid(key, e)),
        None => Ok(default),
    }
}

fn secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse(lookup, key, default.as_secs()).map(Duration::from_secs)
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8082".to_string()
}

fn default_read_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_max_body_bytes() -> usize {
    pixel_http::codec::DEFAULT_MAX_BODY_BYTES
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_access_ttl() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_refresh_ttl() -> Duration {
    Duration::from_secs(336 * 60 * 60)
}

fn default_code_ttl() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_login_schedule() -> Schedule {
    Schedule::login(Duration::from_secs(60))
}

fn default_secret_schedule() -> Schedule {
    Schedule::one_time_secret(Duration::from_secs(60))
}

fn default_avatars_dir() -> PathBuf {
    PathBuf::from("media/images/avatars")
}
