use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::Session;
use crate::error::Result;
use crate::storage::server_cookies::ServerCookieJar;
use crate::storage::traits::CredentialStore;

/// In-memory credential store; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    session: RwLock<Session>,
    server: Arc<ServerCookieJar>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a session, e.g. one left over from a previous run
    pub fn with_session(session: Session) -> Self {
        Self {
            session: RwLock::new(session),
            server: Arc::default(),
        }
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> Session {
        self.session.read().await.clone()
    }

    async fn set(&self, session: &Session) -> Result<()> {
        if session.access_token.is_none() {
            return self.clear().await;
        }
        *self.session.write().await = session.clone();
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.session.write().await = Session::empty();
        self.server.clear()
    }

    fn server_cookies(&self) -> Option<Arc<ServerCookieJar>> {
        Some(self.server.clone())
    }
}
