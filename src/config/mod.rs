//! Configuration loading for the console gateway.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `CONSOLE_GATEWAY_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Prefix shared by every environment variable the gateway reads.
pub const ENV_PREFIX: &str = "CONSOLE_GATEWAY_";

const REDACTED: &str = "[REDACTED]";

/// Application configuration derived from `CONSOLE_GATEWAY_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Origin of the backend service every forwarded call targets.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Upper bound for a single outbound call, in milliseconds.
    #[serde(default = "default_backend_timeout_ms")]
    pub backend_timeout_ms: u64,
    /// HMAC secret used to verify session cookies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_secret: Option<String>,
    #[serde(default = "default_session_cookie_name")]
    pub session_cookie_name: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            backend_url: default_backend_url(),
            backend_timeout_ms: default_backend_timeout_ms(),
            session_secret: None,
            session_cookie_name: default_session_cookie_name(),
            max_upload_bytes: default_max_upload_bytes(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns the parsed backend origin.
    pub fn backend_origin(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.backend_url).map_err(|source| ConfigError::InvalidBackendUrl {
            value: self.backend_url.clone(),
            source,
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::UnsupportedBackendScheme {
                value: self.backend_url.clone(),
            });
        }

        Ok(url)
    }

    /// Timeout applied to every outbound backend call.
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// Session secret, falling back to a fixed development value in local and test profiles.
    pub fn effective_session_secret(&self) -> Option<String> {
        self.session_secret.clone().or_else(|| {
            self.is_development()
                .then(|| "local-dev-session-secret".to_string())
        })
    }

    /// Whether the profile relaxes production-only requirements.
    pub fn is_development(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if config.session_secret.is_some() {
            config.session_secret = Some(REDACTED.to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend_origin()?;

        if self.backend_timeout_ms == 0 || self.backend_timeout_ms > 300_000 {
            return Err(ConfigError::InvalidBackendTimeout {
                value: self.backend_timeout_ms,
            });
        }

        if !self.is_development() && self.session_secret.is_none() {
            return Err(ConfigError::MissingSessionSecret);
        }

        if let Some(secret) = &self.session_secret
            && secret.len() < 16
        {
            return Err(ConfigError::WeakSessionSecret {
                length: secret.len(),
            });
        }

        if self.session_cookie_name.trim().is_empty() {
            return Err(ConfigError::EmptySessionCookieName);
        }

        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidMaxUploadBytes {
                value: self.max_upload_bytes,
            });
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_backend_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_backend_timeout_ms() -> u64 {
    30_000
}

fn default_session_cookie_name() -> String {
    "console_session".to_string()
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid backend url '{value}': {source}")]
    InvalidBackendUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("backend url '{value}' must be an absolute http or https origin")]
    UnsupportedBackendScheme { value: String },
    #[error("invalid value '{value}' for {key}; expected an unsigned integer")]
    InvalidNumber { key: String, value: String },
    #[error("backend timeout must be between 1 and 300000 milliseconds, got {value}")]
    InvalidBackendTimeout { value: u64 },
    #[error("session secret is missing; set CONSOLE_GATEWAY_SESSION_SECRET")]
    MissingSessionSecret,
    #[error("session secret must be at least 16 bytes, got {length}")]
    WeakSessionSecret { length: usize },
    #[error("session cookie name must not be empty")]
    EmptySessionCookieName,
    #[error("max upload size must be positive, got {value}")]
    InvalidMaxUploadBytes { value: usize },
}

/// Loads configuration using layered `.env` files and `CONSOLE_GATEWAY_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates configuration; process variables win over every file layer.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_non_empty(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let api_bind_addr =
            take_non_empty(&mut layered, "API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take_non_empty(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_non_empty(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let backend_url =
            take_non_empty(&mut layered, "BACKEND_URL").unwrap_or_else(default_backend_url);
        let backend_timeout_ms = take_number(&mut layered, "BACKEND_TIMEOUT_MS")?
            .unwrap_or_else(default_backend_timeout_ms);
        let session_secret = take_non_empty(&mut layered, "SESSION_SECRET");
        let session_cookie_name = take_non_empty(&mut layered, "SESSION_COOKIE_NAME")
            .unwrap_or_else(default_session_cookie_name);
        let max_upload_bytes = take_number(&mut layered, "MAX_UPLOAD_BYTES")?
            .unwrap_or_else(default_max_upload_bytes);
        let cors_allowed_origins = take_non_empty(&mut layered, "CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            backend_url,
            backend_timeout_ms,
            session_secret,
            session_cookie_name,
            max_upload_bytes,
            cors_allowed_origins,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var(format!("{ENV_PREFIX}PROFILE"))
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(self.base_dir.join(format!(".env.{profile}")), &mut values)?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{profile}.local")),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_non_empty(values: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    values.remove(key).filter(|v| !v.trim().is_empty())
}

fn take_number<T: std::str::FromStr>(
    values: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match take_non_empty(values, key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber {
                key: format!("{ENV_PREFIX}{key}"),
                value: raw,
            }),
        None => Ok(None),
    }
}
