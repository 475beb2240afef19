//! Persistent jar for cookies set by the API
//!
//! The API keeps its refresh credential in an HTTP-only cookie. This jar is
//! handed to the reqwest client as its cookie provider so that credential
//! survives a restart alongside the session cookies.

use chrono::Utc;
use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::Result;
use crate::storage::cookie::CookieRecord;

#[derive(Debug, Default)]
pub struct ServerCookieJar {
    /// Backing file; `None` keeps the cookies in memory only
    path: Option<PathBuf>,
    records: RwLock<Vec<CookieRecord>>,
}

impl ServerCookieJar {
    /// Jar backed by `path`, loading whatever a previous run left there
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = load(&path);
        Self {
            path: Some(path),
            records: RwLock::new(records),
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Live cookies currently held
    pub fn records(&self) -> Vec<CookieRecord> {
        let now = Utc::now();
        self.read().iter().filter(|c| !c.is_expired(now)).cloned().collect()
    }

    /// Forget every server cookie, in memory and on disk
    pub fn clear(&self) -> Result<()> {
        self.write().clear();
        let Some(path) = &self.path else {
            return Ok(());
        };
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CookieRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CookieRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, records: &[CookieRecord]) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn load(path: &Path) -> Vec<CookieRecord> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            log::warn!("Server cookie jar {} unreadable: {}", path.display(), e);
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<CookieRecord>>(&raw) {
        Ok(records) => {
            let now = Utc::now();
            records.into_iter().filter(|c| !c.is_expired(now)).collect()
        }
        Err(e) => {
            log::warn!("Server cookie jar {} is corrupt, ignoring: {}", path.display(), e);
            Vec::new()
        }
    }
}

impl CookieStore for ServerCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let host = url.host_str().unwrap_or_default();
        let now = Utc::now();

        let incoming: Vec<CookieRecord> = cookie_headers
            .filter_map(|header| header.to_str().ok())
            .filter_map(|header| CookieRecord::from_set_cookie(header, host, now))
            .collect();
        if incoming.is_empty() {
            return;
        }

        let snapshot = {
            let mut records = self.write();
            for cookie in incoming {
                records.retain(|c| !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path));
                if !cookie.is_expired(now) {
                    records.push(cookie);
                }
            }
            records.retain(|c| !c.is_expired(now));
            records.clone()
        };

        log::debug!("Stored {} server cookies for {}", snapshot.len(), host);
        if let Err(e) = self.persist(&snapshot) {
            log::warn!("Failed to persist server cookies: {}", e);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let now = Utc::now();
        let header = self
            .read()
            .iter()
            .filter(|c| !c.is_expired(now) && c.matches(url))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}
