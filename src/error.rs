use serde::Serialize;
use std::error::Error;
use std::fmt;
use std::sync::PoisonError;

/// A failed API call as surfaced to callers: HTTP status (when a response
/// arrived) plus whatever body the server sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiFailure {
    pub status: Option<u16>,
    pub data: serde_json::Value,
}

impl ApiFailure {
    pub fn new(status: Option<u16>, data: serde_json::Value) -> Self {
        Self { status, data }
    }

    /// True for HTTP 401
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    /// Human-readable message for a transient notification. Uses the
    /// server's `message` field when the body carries one.
    pub fn message(&self) -> String {
        if let Some(msg) = self.data.get("message").and_then(|m| m.as_str()) {
            return msg.to_string();
        }
        match self.status {
            Some(status) => format!("Request failed with status {}", status),
            None => "Request failed".to_string(),
        }
    }
}

#[derive(Debug)]
pub enum GuardError {
    // API errors
    Api(ApiFailure),
    Network(String),
    Timeout,

    // Session errors
    RefreshFailed(String),
    SessionLock(String),

    // Storage errors
    StorageError(String),

    // Serialization errors
    InvalidPayload(String),

    // Configuration errors
    ConfigError(String),
}

impl GuardError {
    /// The `{status, data}` view of this error, if it came from the API
    pub fn api_failure(&self) -> Option<&ApiFailure> {
        match self {
            Self::Api(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.api_failure().and_then(|f| f.status)
    }
}

impl fmt::Display for GuardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(failure) => match failure.status {
                Some(status) => write!(f, "API error ({}): {}", status, failure.message()),
                None => write!(f, "API error: {}", failure.message()),
            },
            Self::Network(msg) => write!(f, "Network error: {}", msg),
            Self::Timeout => write!(f, "Request timed out"),
            Self::RefreshFailed(msg) => write!(f, "Token refresh failed: {}", msg),
            Self::SessionLock(msg) => write!(f, "Session lock error: {}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::InvalidPayload(msg) => write!(f, "Invalid payload: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl Error for GuardError {}

impl From<reqwest::Error> for GuardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GuardError::Timeout
        } else if err.is_decode() {
            GuardError::InvalidPayload(err.to_string())
        } else {
            GuardError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::InvalidPayload(err.to_string())
    }
}

impl From<std::io::Error> for GuardError {
    fn from(err: std::io::Error) -> Self {
        GuardError::StorageError(err.to_string())
    }
}

// Converting from PoisonError to facilitate poisoned mutex handling
impl<T> From<PoisonError<T>> for GuardError {
    fn from(err: PoisonError<T>) -> Self {
        GuardError::SessionLock(format!("Mutex poisoned: {}", err))
    }
}

/// Install a panic hook that routes panics through the logger before the
/// default hook runs. Backstop only; nothing is recovered here.
pub fn install_panic_logger() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("Unhandled panic: {}", info);
        default_hook(info);
    }));
}

// Generic result type for the guard
pub type Result<T> = std::result::Result<T, GuardError>;
