// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values, and the
//! typed configuration loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for the session database and audit log | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `TLS_CERT_PATH` | PEM certificate chain (HTTPS when set with key) | Optional |
//! | `TLS_KEY_PATH` | PEM private key | Optional |
//! | `SESSION_SIGNING_SECRET` | HS256 shared secret (>= 32 bytes) | Required |
//! | `SESSION_MASTER_KEY` | Master secret for cookie sealing keys (>= 32 bytes) | Required |
//! | `SESSION_ISSUER` | `iss` claim written and expected | `session-guard` |
//! | `SESSION_AUDIENCE` | `aud` claim written and expected | `session-guard-clients` |
//! | `SESSION_APP_KEY` | Key name of the outer cookie layer | `session-guard.cookies.v1` |
//! | `ACCESS_TOKEN_MINUTES` | Signed token lifetime for non-admin users | `1440` |
//! | `REFRESH_TOKEN_DAYS` | Session (token record and cookie) lifetime | `7` |
//! | `REQUIRE_CONFIRMED_EMAIL` | Refuse sessions for unconfirmed emails | `true` |
//! | `COOKIE_SECURE` | Emit the `Secure` cookie attribute | `true` |
//! | `CLIENT_ID` | Client identifier recorded on new sessions | `web` |
//! | `USERS_FILE` | JSON file seeding the user directory | Optional |
//! | `SWEEP_INTERVAL_SECS` | Expired-session purge interval | `300` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const SIGNING_SECRET_ENV: &str = "SESSION_SIGNING_SECRET";
pub const MASTER_KEY_ENV: &str = "SESSION_MASTER_KEY";
pub const ISSUER_ENV: &str = "SESSION_ISSUER";
pub const AUDIENCE_ENV: &str = "SESSION_AUDIENCE";
pub const APP_KEY_ENV: &str = "SESSION_APP_KEY";
pub const ACCESS_MINUTES_ENV: &str = "ACCESS_TOKEN_MINUTES";
pub const REFRESH_DAYS_ENV: &str = "REFRESH_TOKEN_DAYS";
pub const REQUIRE_CONFIRMED_EMAIL_ENV: &str = "REQUIRE_CONFIRMED_EMAIL";
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";
pub const CLIENT_ID_ENV: &str = "CLIENT_ID";
pub const USERS_FILE_ENV: &str = "USERS_FILE";
pub const SWEEP_INTERVAL_ENV: &str = "SWEEP_INTERVAL_SECS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Base directory for persistent state.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Minimum length of the signing secret and the master key, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Signed token lifetime for holders of the admin role.
pub const PRIVILEGED_ACCESS_MINUTES: i64 = 60;

const DEFAULT_ISSUER: &str = "session-guard";
const DEFAULT_AUDIENCE: &str = "session-guard-clients";
const DEFAULT_APP_KEY: &str = "session-guard.cookies.v1";
const DEFAULT_ACCESS_MINUTES: i64 = 1440;
const DEFAULT_REFRESH_DAYS: i64 = 7;
const DEFAULT_CLIENT_ID: &str = "web";
const DEFAULT_SWEEP_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Protocol parameters shared by the credential issuer and the authenticator.
#[derive(Clone)]
pub struct SessionSettings {
    /// HS256 shared secret.
    pub signing_secret: Vec<u8>,
    /// Expected and emitted `iss` claim.
    pub issuer: String,
    /// Expected and emitted `aud` claim.
    pub audience: String,
    /// Key name of the outer (application-scoped) cookie layer.
    pub app_key: String,
    /// Signed token lifetime for non-admin users.
    pub access_window: ChronoDuration,
    /// Signed token lifetime for admins.
    pub privileged_window: ChronoDuration,
    /// Token record and cookie lifetime.
    pub refresh_window: ChronoDuration,
    /// Whether unconfirmed emails are refused a session.
    pub require_confirmed_email: bool,
}

impl std::fmt::Debug for SessionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSettings")
            .field("signing_secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("app_key", &self.app_key)
            .field("access_window", &self.access_window)
            .field("privileged_window", &self.privileged_window)
            .field("refresh_window", &self.refresh_window)
            .field("require_confirmed_email", &self.require_confirmed_email)
            .finish()
    }
}

impl SessionSettings {
    /// Settings with defaults for everything but the signing secret.
    pub fn new(signing_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            app_key: DEFAULT_APP_KEY.to_string(),
            access_window: ChronoDuration::minutes(DEFAULT_ACCESS_MINUTES),
            privileged_window: ChronoDuration::minutes(PRIVILEGED_ACCESS_MINUTES),
            refresh_window: ChronoDuration::days(DEFAULT_REFRESH_DAYS),
            require_confirmed_email: true,
        }
    }
}

/// Full process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub tls_cert_path: Option<PathBuf>,
    pub tls_key_path: Option<PathBuf>,
    pub master_key: MasterKey,
    pub session: SessionSettings,
    pub cookie_secure: bool,
    pub client_id: String,
    pub users_file: Option<PathBuf>,
    pub sweep_interval: Duration,
    pub log_format: LogFormat,
}

/// Master secret for the protector key ring. Never printed.
#[derive(Clone)]
pub struct MasterKey(pub Vec<u8>);

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let signing_secret = required_secret(&lookup, SIGNING_SECRET_ENV)?;
        let master_key = required_secret(&lookup, MASTER_KEY_ENV)?;

        let access_minutes: i64 = parse_or(&lookup, ACCESS_MINUTES_ENV, DEFAULT_ACCESS_MINUTES)?;
        let refresh_days: i64 = parse_or(&lookup, REFRESH_DAYS_ENV, DEFAULT_REFRESH_DAYS)?;
        if access_minutes <= 0 {
            return Err(ConfigError::Invalid {
                name: ACCESS_MINUTES_ENV,
                reason: "must be positive".to_string(),
            });
        }
        if refresh_days <= 0 {
            return Err(ConfigError::Invalid {
                name: REFRESH_DAYS_ENV,
                reason: "must be positive".to_string(),
            });
        }

        let mut session = SessionSettings::new(signing_secret);
        session.issuer = lookup(ISSUER_ENV).unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        session.audience = lookup(AUDIENCE_ENV).unwrap_or_else(|| DEFAULT_AUDIENCE.to_string());
        session.app_key = lookup(APP_KEY_ENV).unwrap_or_else(|| DEFAULT_APP_KEY.to_string());
        session.access_window = ChronoDuration::minutes(access_minutes);
        session.refresh_window = ChronoDuration::days(refresh_days);
        session.require_confirmed_email = parse_bool_or(&lookup, REQUIRE_CONFIRMED_EMAIL_ENV, true)?;

        let log_format = match lookup(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: LOG_FORMAT_ENV,
                    reason: format!("expected `json` or `pretty`, got `{other}`"),
                })
            }
        };

        Ok(Self {
            data_dir: lookup(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            host: lookup(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&lookup, PORT_ENV, 8080)?,
            tls_cert_path: lookup(TLS_CERT_PATH_ENV).map(PathBuf::from),
            tls_key_path: lookup(TLS_KEY_PATH_ENV).map(PathBuf::from),
            master_key: MasterKey(master_key),
            session,
            cookie_secure: parse_bool_or(&lookup, COOKIE_SECURE_ENV, true)?,
            client_id: lookup(CLIENT_ID_ENV).unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            users_file: lookup(USERS_FILE_ENV).map(PathBuf::from),
            sweep_interval: Duration::from_secs(parse_or(
                &lookup,
                SWEEP_INTERVAL_ENV,
                DEFAULT_SWEEP_SECS,
            )?),
            log_format,
        })
    }
}

fn required_secret<F>(lookup: &F, name: &'static str) -> Result<Vec<u8>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(name).ok_or(ConfigError::Missing(name))?;
    if value.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
        });
    }
    Ok(value.into_bytes())
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool_or<F>(lookup: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if v == "1" || v == "true" => Ok(true),
        Some(v) if v == "0" || v == "false" => Ok(false),
        Some(v) => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got `{v}`"),
        }),
    }
}
