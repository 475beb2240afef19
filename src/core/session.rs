use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

use crate::auth::{Role, Session, User};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::storage::{CookieCredentialStore, CredentialStore, ServerCookieJar};

/// Read-only view of the session handed to the rest of the application
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub is_authenticated: bool,
    pub role: Option<Role>,
    /// False until the first read of the credential store has completed.
    /// Consumers must not make decisions while this is false.
    pub is_client: bool,
}

impl SessionSnapshot {
    fn hydrated(session: &Session) -> Self {
        Self {
            user: session.user.clone(),
            access_token: session.access_token.clone(),
            is_authenticated: session.user.is_some() || session.access_token.is_some(),
            role: session.effective_role(),
            is_client: true,
        }
    }

    /// The session this snapshot was derived from
    pub fn to_session(&self) -> Session {
        Session {
            user: self.user.clone(),
            access_token: self.access_token.clone(),
            role: self.role,
        }
    }
}

/// Owns the current session.
///
/// The credential store is the source of truth; the snapshot held in the
/// watch channel is a cache that is only updated after the store accepted
/// the write (clearing is the exception, the cache is always emptied).
///
/// Every `clear` starts a new epoch. Writes that captured an older epoch
/// (a refresh that was in flight during logout) are discarded.
pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    snapshot: watch::Sender<SessionSnapshot>,
    epoch: Mutex<u64>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            store,
            snapshot,
            epoch: Mutex::new(0),
        }
    }

    /// Session manager over the cookie jar named in the configuration, or an
    /// unavailable store when none is configured
    pub fn from_config(config: &ClientConfig) -> Self {
        let store: Arc<dyn CredentialStore> = match &config.credentials_path {
            Some(path) => Arc::new(CookieCredentialStore::new(path, config.secure_cookies)),
            None => Arc::new(CookieCredentialStore::unavailable()),
        };
        Self::new(store)
    }

    /// Perform the first client-side read of the credential store
    pub async fn hydrate(&self) -> SessionSnapshot {
        let session = self.store.get().await;
        let snapshot = SessionSnapshot::hydrated(&session);
        log::debug!(
            "Session hydrated (authenticated={}, role={:?})",
            snapshot.is_authenticated,
            snapshot.role
        );
        self.snapshot.send_replace(snapshot.clone());
        snapshot
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified whenever the session is hydrated, replaced or cleared
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Current session epoch, for [`SessionManager::set_session_if_current`]
    pub fn epoch(&self) -> u64 {
        *self.lock_epoch()
    }

    /// The store's jar for API-set cookies, if it keeps one
    pub fn server_cookies(&self) -> Option<Arc<ServerCookieJar>> {
        self.store.server_cookies()
    }

    pub fn is_hydrated(&self) -> bool {
        self.snapshot.borrow().is_client
    }

    /// Token to attach to the next request. Before hydration this reads the
    /// store directly.
    pub async fn access_token(&self) -> Option<String> {
        if self.is_hydrated() {
            return self.snapshot.borrow().access_token.clone();
        }
        self.store.get().await.access_token
    }

    /// Current session, reading the store if not hydrated yet
    pub async fn current_session(&self) -> Session {
        if self.is_hydrated() {
            return self.snapshot.borrow().to_session();
        }
        self.store.get().await
    }

    /// Persist a new session and publish it
    pub async fn set_session(&self, session: Session) -> Result<()> {
        self.store.set(&session).await?;
        self.snapshot.send_replace(SessionSnapshot::hydrated(&session));
        Ok(())
    }

    /// Persist and publish `session` only if nothing cleared the session
    /// since `epoch` was read. Returns `false` when the write was discarded.
    pub async fn set_session_if_current(&self, epoch: u64, session: Session) -> Result<bool> {
        if self.epoch() != epoch {
            return Ok(false);
        }
        self.store.set(&session).await?;

        let published = {
            let current = self.lock_epoch();
            if *current == epoch {
                self.snapshot.send_replace(SessionSnapshot::hydrated(&session));
            }
            *current == epoch
        };
        if !published {
            // A clear ran while the store was being written
            self.store.clear().await?;
        }
        Ok(published)
    }

    /// Drop the session everywhere. Safe to call when already signed out.
    pub async fn clear(&self) -> Result<()> {
        {
            let mut epoch = self.lock_epoch();
            *epoch += 1;
            self.snapshot.send_replace(SessionSnapshot::hydrated(&Session::empty()));
        }
        self.store.clear().await
    }

    fn lock_epoch(&self) -> MutexGuard<'_, u64> {
        self.epoch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
