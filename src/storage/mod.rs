//! Credential stores persisting the session between runs

pub mod cookie;
pub mod cookie_jar;
pub mod memory;
pub mod server_cookies;
pub mod traits;

// Re-export the stores
pub use cookie::{parse_cookie_header, CookieRecord, SameSite};
pub use cookie_jar::CookieCredentialStore;
pub use memory::MemoryCredentialStore;
pub use server_cookies::ServerCookieJar;
pub use traits::CredentialStore;
