//! Session state and the authenticated request pipeline

pub mod payload;
pub mod pipeline;
pub mod refresh;
pub mod session;

// Re-export main components for convenience
pub use payload::AuthPayload;
pub use pipeline::{ApiClient, ApiRequest};
pub use refresh::RefreshCoordinator;
pub use session::{SessionManager, SessionSnapshot};
