//! User, role and session types shared across the guard

pub mod role;
pub mod session;
pub mod user;

// Re-export main components
pub use role::Role;
pub use session::Session;
pub use user::{User, UserStatus};
