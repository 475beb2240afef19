//! Abstract credential storage interface for pluggable backends

use async_trait::async_trait;
use std::sync::Arc;

use crate::auth::Session;
use crate::error::Result;
use crate::storage::server_cookies::ServerCookieJar;

/// Durable persistence of the current session credentials.
///
/// Implementations must keep `access_token` and `role` consistent: a `set`
/// either lands completely or not at all, a session without a token is
/// never stored, and `get` never fails. When no storage is reachable `get`
/// returns [`Session::empty`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Best-effort read of the persisted session
    async fn get(&self) -> Session;

    /// Replace the persisted session
    async fn set(&self, session: &Session) -> Result<()>;

    /// Remove every session key. Clearing an empty store is not an error.
    async fn clear(&self) -> Result<()>;

    /// Jar for the cookies the API sets, emptied by `clear`. `None` leaves
    /// them to a jar private to the HTTP client.
    fn server_cookies(&self) -> Option<Arc<ServerCookieJar>> {
        None
    }
}
