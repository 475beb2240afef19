//! Client and edge-gate configuration
//! Values come from environment variables; the gate binary also loads `.env`.

use crate::constants::{
    DEFAULT_API_URL, DEFAULT_APP_ORIGIN, DEFAULT_GATE_HOST, DEFAULT_GATE_PORT,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STATIC_DIR,
};
use crate::error::{GuardError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Configuration for the authenticated API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL without trailing slash, e.g. `https://host/api/v1`
    pub api_base_url: String,
    /// Origin the application is served from
    pub app_origin: String,
    /// Whether persisted cookies carry the `Secure` attribute
    pub secure_cookies: bool,
    /// Per-request timeout, applied to business calls and the refresh call alike
    pub request_timeout: Duration,
    /// Cookie jar location; `None` means no durable storage is available
    pub credentials_path: Option<PathBuf>,
}

impl ClientConfig {
    /// Build a configuration for the given API base URL with defaults for
    /// everything else.
    pub fn new(api_base_url: &str) -> Result<Self> {
        let api_base_url = normalize_base_url(api_base_url)?;
        let app_origin = DEFAULT_APP_ORIGIN.to_string();
        let secure_cookies = is_https(&app_origin)?;

        Ok(Self {
            api_base_url,
            app_origin,
            secure_cookies,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            credentials_path: None,
        })
    }

    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("EDUPULSE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_base_url = normalize_base_url(&api_base_url)?;

        let app_origin = lookup("EDUPULSE_APP_ORIGIN").unwrap_or_else(|| DEFAULT_APP_ORIGIN.to_string());
        let secure_cookies = is_https(&app_origin)?;

        let timeout_secs = lookup("EDUPULSE_REQUEST_TIMEOUT_SECS")
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(GuardError::ConfigError(
                "EDUPULSE_REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let credentials_path = lookup("EDUPULSE_CREDENTIALS_PATH")
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            api_base_url,
            app_origin,
            secure_cookies,
            request_timeout: Duration::from_secs(timeout_secs),
            credentials_path,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    /// Full URL for an API path such as `/users/login`
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.api_base_url, path)
        } else {
            format!("{}/{}", self.api_base_url, path)
        }
    }
}

/// Configuration for the edge gate server
#[derive(Debug, Clone)]
pub struct GateConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the exported front-end
    pub static_dir: PathBuf,
}

impl GateConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("EDUPULSE_GATE_HOST").unwrap_or(DEFAULT_GATE_HOST.to_string());
        let port = match lookup("EDUPULSE_GATE_PORT") {
            Some(p) => p.parse().map_err(|_| {
                GuardError::ConfigError(format!("EDUPULSE_GATE_PORT is not a valid port: {}", p))
            })?,
            None => DEFAULT_GATE_PORT,
        };
        let static_dir = lookup("EDUPULSE_GATE_STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        Ok(Self { host, port, static_dir })
    }
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| GuardError::ConfigError(format!("Invalid API URL '{}': {}", raw, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed.as_str().trim_end_matches('/').to_string()),
        other => Err(GuardError::ConfigError(format!(
            "API URL must use http or https, got '{}'",
            other
        ))),
    }
}

fn is_https(origin: &str) -> Result<bool> {
    let parsed = Url::parse(origin)
        .map_err(|e| GuardError::ConfigError(format!("Invalid app origin '{}': {}", origin, e)))?;
    Ok(parsed.scheme() == "https")
}
