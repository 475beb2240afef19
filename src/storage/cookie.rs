//! Cookie records and header helpers shared by the cookie jar stores and
//! the edge guard.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use reqwest::Url;
use std::collections::HashMap;

use crate::constants::COOKIE_MAX_AGE_DAYS;

/// Upper bound on server-supplied `Max-Age` (400 days)
const MAX_SERVER_COOKIE_AGE_SECS: i64 = 400 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// A single persisted cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub path: String,
    pub expires_at: DateTime<Utc>,
    pub same_site: SameSite,
    pub secure: bool,
    /// Host that set the cookie; `None` for cookies written locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl CookieRecord {
    /// Session cookie with the standard attributes: 7-day expiry, path `/`,
    /// `SameSite=Lax`, `Secure` as requested.
    pub fn session(name: &str, value: &str, secure: bool) -> Self {
        Self::session_at(name, value, secure, Utc::now())
    }

    pub fn session_at(name: &str, value: &str, secure: bool, now: DateTime<Utc>) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            path: "/".to_string(),
            expires_at: now + Duration::days(COOKIE_MAX_AGE_DAYS),
            same_site: SameSite::Lax,
            secure,
            domain: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Render as a `Set-Cookie` header value. The value is percent-encoded.
    pub fn set_cookie_header(&self) -> String {
        let mut header = format!(
            "{}={}; Path={}; Expires={}; SameSite={}",
            self.name,
            urlencoding::encode(&self.value),
            self.path,
            self.expires_at.format("%a, %d %b %Y %H:%M:%S GMT"),
            self.same_site.as_str(),
        );
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }

    /// Parse a `Set-Cookie` value received from `host`. `Max-Age` takes
    /// precedence over `Expires`; a cookie with neither lives as long as the
    /// session cookies. The value is kept exactly as the server sent it.
    pub fn from_set_cookie(header: &str, host: &str, now: DateTime<Utc>) -> Option<Self> {
        let mut parts = header.split(';');
        let (name, value) = parts.next()?.trim().split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        let mut record = Self::session_at(name, value.trim(), false, now);
        record.domain = Some(host.to_string());
        let mut max_age = None;

        for attr in parts {
            let (key, val) = match attr.split_once('=') {
                Some((key, val)) => (key.trim(), val.trim()),
                None => (attr.trim(), ""),
            };
            match key.to_ascii_lowercase().as_str() {
                "path" if val.starts_with('/') => record.path = val.to_string(),
                "expires" => {
                    if let Ok(at) = DateTime::parse_from_rfc2822(val) {
                        record.expires_at = at.with_timezone(&Utc);
                    }
                }
                "max-age" => max_age = val.parse::<i64>().ok(),
                "secure" => record.secure = true,
                "samesite" => {
                    record.same_site = match val.to_ascii_lowercase().as_str() {
                        "strict" => SameSite::Strict,
                        "none" => SameSite::None,
                        _ => SameSite::Lax,
                    }
                }
                _ => {}
            }
        }

        if let Some(secs) = max_age {
            record.expires_at = now + Duration::seconds(secs.clamp(-1, MAX_SERVER_COOKIE_AGE_SECS));
        }
        Some(record)
    }

    /// Whether this cookie should accompany a request to `url`
    pub fn matches(&self, url: &Url) -> bool {
        let host_ok = match &self.domain {
            Some(domain) => url.host_str() == Some(domain.as_str()),
            None => true,
        };
        host_ok && url.path().starts_with(&self.path) && (!self.secure || url.scheme() == "https")
    }
}

/// Parse a `Cookie` request header into name/value pairs. Values are
/// percent-decoded; pairs that fail to decode are kept verbatim.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"');
            let decoded = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            Some((name.to_string(), decoded))
        })
        .collect()
}
