// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded once from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for links, statements, blobs and audit logs | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `PUBLIC_BASE_URL` | Base of generated download URLs | `http://localhost:8080` |
//! | `ENCRYPTION_KEY` | 32-byte master key (base64, URL-safe or standard) | Required |
//! | `KEY_DERIVATION` | `per-file` or `static` | `per-file` |
//! | `API_KEYS` | Comma-separated staff API keys | Required |
//! | `DEFAULT_LINK_MINUTES` | Link lifetime when a request omits it | `60` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use url::Url;

use crate::delivery::CipherKey;
use crate::storage::paths::DATA_ROOT;

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const PUBLIC_BASE_URL_ENV: &str = "PUBLIC_BASE_URL";
pub const ENCRYPTION_KEY_ENV: &str = "ENCRYPTION_KEY";
pub const KEY_DERIVATION_ENV: &str = "KEY_DERIVATION";
pub const API_KEYS_ENV: &str = "API_KEYS";
pub const DEFAULT_LINK_MINUTES_ENV: &str = "DEFAULT_LINK_MINUTES";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Default log filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_LINK_MINUTES: i64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("ENCRYPTION_KEY must be base64 encoding exactly 32 bytes")]
    InvalidEncryptionKey,
}

impl ConfigError {
    fn invalid(var: &'static str, reason: impl fmt::Display) -> Self {
        ConfigError::Invalid {
            var,
            reason: reason.to_string(),
        }
    }
}

/// How per-file keys are obtained from the master key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDerivation {
    /// Every key id maps to the master key.
    Static,
    /// HMAC-SHA256(master, key id).
    PerFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Validated service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub public_base_url: Url,
    pub encryption_key: CipherKey,
    pub key_derivation: KeyDerivation,
    pub api_keys: Vec<String>,
    pub default_link_minutes: i64,
    pub log_format: LogFormat,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let port = match var(PORT_ENV) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid(PORT_ENV, e))?,
            None => DEFAULT_PORT,
        };

        let public_base_url = var(PUBLIC_BASE_URL_ENV)
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string());
        let public_base_url =
            Url::parse(public_base_url.trim()).map_err(|e| ConfigError::invalid(PUBLIC_BASE_URL_ENV, e))?;
        if public_base_url.cannot_be_a_base() {
            return Err(ConfigError::invalid(
                PUBLIC_BASE_URL_ENV,
                "must be an absolute http(s) URL",
            ));
        }

        let encryption_key = var(ENCRYPTION_KEY_ENV)
            .ok_or(ConfigError::Missing(ENCRYPTION_KEY_ENV))
            .and_then(|raw| {
                CipherKey::from_base64(raw.trim()).ok_or(ConfigError::InvalidEncryptionKey)
            })?;

        let key_derivation = match var(KEY_DERIVATION_ENV).as_deref().map(str::trim) {
            None | Some("per-file") => KeyDerivation::PerFile,
            Some("static") => KeyDerivation::Static,
            Some(other) => {
                return Err(ConfigError::invalid(
                    KEY_DERIVATION_ENV,
                    format!("expected 'per-file' or 'static', got '{other}'"),
                ))
            }
        };

        let api_keys: Vec<String> = var(API_KEYS_ENV)
            .ok_or(ConfigError::Missing(API_KEYS_ENV))?
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();
        if api_keys.is_empty() {
            return Err(ConfigError::Missing(API_KEYS_ENV));
        }

        let default_link_minutes = match var(DEFAULT_LINK_MINUTES_ENV) {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(minutes) if minutes > 0 => minutes,
                Ok(_) => {
                    return Err(ConfigError::invalid(
                        DEFAULT_LINK_MINUTES_ENV,
                        "must be positive",
                    ))
                }
                Err(e) => return Err(ConfigError::invalid(DEFAULT_LINK_MINUTES_ENV, e)),
            },
            None => DEFAULT_LINK_MINUTES,
        };

        let log_format = match var(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        Ok(Self {
            data_dir: var(DATA_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DATA_ROOT)),
            host: var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            public_base_url,
            encryption_key,
            key_derivation,
            api_keys,
            default_link_minutes,
            log_format,
        })
    }

    /// Socket address to bind. `HOST` is an IPv4 or IPv6 address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .host
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(HOST_ENV, e))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}
