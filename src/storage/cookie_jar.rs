//! File-backed cookie jar holding the session cookies
//!
//! The jar is a JSON array of [`CookieRecord`]s. Writes go to a sibling
//! temporary file which is then renamed over the jar, so readers observe
//! either the old or the new set of cookies, never a mix. Cookies set by the
//! API live in a second file next to it (see [`ServerCookieJar`]).

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::auth::{Role, Session, User};
use crate::constants::{ACCESS_TOKEN_COOKIE, ROLE_COOKIE, USER_COOKIE};
use crate::error::Result;
use crate::storage::cookie::CookieRecord;
use crate::storage::server_cookies::ServerCookieJar;
use crate::storage::traits::CredentialStore;

pub struct CookieCredentialStore {
    /// Jar location; `None` when no durable storage is available
    path: Option<PathBuf>,
    secure: bool,
    write_lock: Mutex<()>,
    server: Arc<ServerCookieJar>,
}

impl CookieCredentialStore {
    pub fn new(path: impl Into<PathBuf>, secure: bool) -> Self {
        let path = path.into();
        Self {
            server: Arc::new(ServerCookieJar::new(path.with_extension("server.json"))),
            path: Some(path),
            secure,
            write_lock: Mutex::new(()),
        }
    }

    /// Store with no backing file. Reads return the empty session and
    /// writes are dropped.
    pub fn unavailable() -> Self {
        Self {
            path: None,
            secure: false,
            write_lock: Mutex::new(()),
            server: Arc::new(ServerCookieJar::in_memory()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Live (non-expired) cookies currently in the jar
    pub async fn cookies(&self) -> Vec<CookieRecord> {
        let Some(path) = &self.path else {
            return Vec::new();
        };

        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("Cookie jar {} unreadable: {}", path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<CookieRecord>>(&raw) {
            Ok(records) => {
                let now = Utc::now();
                records.into_iter().filter(|c| !c.is_expired(now)).collect()
            }
            Err(e) => {
                log::warn!("Cookie jar {} is corrupt, ignoring: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// `Set-Cookie` header values mirroring the jar, for handing the session
    /// to a browser
    pub async fn set_cookie_headers(&self) -> Vec<String> {
        self.cookies().await.iter().map(CookieRecord::set_cookie_header).collect()
    }

    async fn write_records(&self, path: &Path, records: &[CookieRecord]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = path.with_extension("tmp");
        let body = serde_json::to_vec_pretty(records)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn session_from_cookies(cookies: &[CookieRecord]) -> Session {
    let find = |name: &str| cookies.iter().find(|c| c.name == name).map(|c| c.value.as_str());

    let Some(token) = find(ACCESS_TOKEN_COOKIE) else {
        return Session::empty();
    };

    let role = find(ROLE_COOKIE).and_then(|r| match r.parse::<Role>() {
        Ok(role) => Some(role),
        Err(e) => {
            log::warn!("Ignoring persisted role tag: {}", e);
            None
        }
    });
    let user = find(USER_COOKIE).and_then(|u| serde_json::from_str::<User>(u).ok());

    Session {
        user,
        access_token: Some(token.to_string()),
        role,
    }
}

#[async_trait]
impl CredentialStore for CookieCredentialStore {
    async fn get(&self) -> Session {
        session_from_cookies(&self.cookies().await)
    }

    async fn set(&self, session: &Session) -> Result<()> {
        let Some(token) = &session.access_token else {
            // A role tag without a token is never persisted
            return self.clear().await;
        };
        let Some(path) = &self.path else {
            log::debug!("No cookie jar configured, session not persisted");
            return Ok(());
        };

        let now = Utc::now();
        let mut records = vec![CookieRecord::session_at(ACCESS_TOKEN_COOKIE, token, self.secure, now)];
        if let Some(role) = session.effective_role() {
            records.push(CookieRecord::session_at(ROLE_COOKIE, role.as_str(), self.secure, now));
        }
        if let Some(user) = &session.user {
            let serialized = serde_json::to_string(user)?;
            records.push(CookieRecord::session_at(USER_COOKIE, &serialized, self.secure, now));
        }

        self.write_records(path, &records).await
    }

    async fn clear(&self) -> Result<()> {
        self.server.clear()?;
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn server_cookies(&self) -> Option<Arc<ServerCookieJar>> {
        Some(self.server.clone())
    }
}
