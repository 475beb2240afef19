//! EduPulse Guard - session and route authorization for the EduPulse LMS
//!
//! This library provides the credential store, the authenticated request
//! pipeline with single-flight token refresh, the session accessor and the
//! role-based route gate, plus a server-side edge guard built on warp.

pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod security_logger;
pub mod storage;

// Re-export main components
pub use auth::{Role, Session, User, UserStatus};
pub use config::{ClientConfig, GateConfig};
pub use core::{ApiClient, ApiRequest, SessionManager, SessionSnapshot};
pub use error::{ApiFailure, GuardError, Result};
pub use guard::{dashboard_for, GateDecision, RouteGate, RoutePolicy};
pub use handlers::AuthHandler;
