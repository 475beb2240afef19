//! Authenticated request pipeline
//!
//! Every request carries the current bearer token. A 401 on anything other
//! than the login or refresh endpoints triggers one shared refresh and a
//! single retry with the token it produced.

use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Session;
use crate::config::ClientConfig;
use crate::constants::{LOGIN_PATH, REFRESH_PATH};
use crate::core::payload::AuthPayload;
use crate::core::refresh::RefreshCoordinator;
use crate::core::session::SessionManager;
use crate::error::{ApiFailure, GuardError, Result};
use crate::security_logger::{log_security_event, SecurityEvent};

/// Retries allowed per call after a refresh
const MAX_RETRIES: u32 = 1;

/// An outbound API call, described relative to the API base URL
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Login and refresh answer 401 for bad credentials; refreshing on
    /// those would loop
    pub fn is_auth_endpoint(&self) -> bool {
        self.path.contains(LOGIN_PATH) || self.path.contains(REFRESH_PATH)
    }
}

pub struct ApiClient {
    http: Client,
    config: ClientConfig,
    sessions: Arc<SessionManager>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    pub fn new(config: ClientConfig, sessions: Arc<SessionManager>) -> Result<Self> {
        // The API's refresh credential is a cookie; keep it in the store's
        // jar so it outlives the process
        let builder = Client::builder().timeout(config.request_timeout);
        let builder = match sessions.server_cookies() {
            Some(jar) => builder.cookie_provider(jar),
            None => builder.cookie_store(true),
        };
        let http = builder
            .build()
            .map_err(|e| GuardError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            sessions,
            refresh: RefreshCoordinator::new(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    /// Send a request, refreshing the session once on 401
    pub async fn send(&self, request: &ApiRequest) -> Result<Value> {
        let mut token = self.sessions.access_token().await;
        let mut attempt = 0;

        loop {
            match self.dispatch(request, token.as_deref(), attempt).await {
                Err(GuardError::Api(failure))
                    if failure.is_unauthorized() && attempt < MAX_RETRIES && !request.is_auth_endpoint() =>
                {
                    let current = self.sessions.access_token().await;
                    let next = match (&token, current) {
                        // Rotated by a refresh that settled while this request was out
                        (sent, Some(current)) if sent.as_deref() != Some(current.as_str()) => Some(current),
                        // Session ended while this request was out
                        (Some(_), None) => None,
                        _ => self.refresh_or_join().await,
                    };
                    match next {
                        Some(fresh) => {
                            token = Some(fresh);
                            attempt += 1;
                        }
                        None => return Err(GuardError::Api(failure)),
                    }
                }
                other => return other,
            }
        }
    }

    /// Send a request and decode the response body
    pub async fn send_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let body = self.send(request).await?;
        Ok(serde_json::from_value(body)?)
    }

    /// Send a request once with the current token, with no refresh on 401
    pub async fn send_once(&self, request: &ApiRequest) -> Result<Value> {
        let token = self.sessions.access_token().await;
        self.dispatch(request, token.as_deref(), MAX_RETRIES).await
    }

    /// Refresh the session now, joining an in-flight refresh if there is one
    pub async fn refresh_session(&self) -> Result<String> {
        self.refresh_or_join()
            .await
            .ok_or_else(|| GuardError::RefreshFailed("no access token issued".to_string()))
    }

    async fn refresh_or_join(&self) -> Option<String> {
        self.refresh.refresh_or_join(|| self.perform_refresh()).await
    }

    async fn dispatch(&self, request: &ApiRequest, token: Option<&str>, attempt: u32) -> Result<Value> {
        let request_id = Uuid::new_v4();
        let url = self.config.endpoint(&request.path);

        let mut builder = self.http.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }

        log::debug!(
            "[{}] {} {} (attempt {}, bearer={})",
            request_id,
            request.method,
            request.path,
            attempt,
            token.is_some()
        );

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let data = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        if status.is_success() {
            Ok(data)
        } else {
            log::debug!("[{}] {} {} -> {}", request_id, request.method, request.path, status);
            Err(GuardError::Api(ApiFailure::new(Some(status.as_u16()), data)))
        }
    }

    /// One call to the refresh endpoint. On success the new token is
    /// persisted before it is handed to anyone; on failure the session is
    /// cleared.
    async fn perform_refresh(&self) -> Option<String> {
        log::info!("Access token rejected, refreshing session");
        let epoch = self.sessions.epoch();

        let outcome = self
            .dispatch(&ApiRequest::post(REFRESH_PATH).json(json!({})), None, 0)
            .await
            .and_then(|body| {
                let payload = AuthPayload::from_value(&body);
                match payload.access_token {
                    Some(token) => Ok((token, payload.user)),
                    None => Err(GuardError::RefreshFailed(
                        "response carried no access token".to_string(),
                    )),
                }
            });

        let (token, returned_user) = match outcome {
            Ok(found) => found,
            Err(e) => {
                self.end_session(e.to_string()).await;
                return None;
            }
        };

        let current = self.sessions.current_session().await;
        let user = returned_user.or(current.user);
        let role = user.as_ref().map(|u| u.role).or(current.role);
        let session = Session {
            user,
            access_token: Some(token.clone()),
            role,
        };

        match self.sessions.set_session_if_current(epoch, session).await {
            Ok(true) => {}
            Ok(false) => {
                log::info!("Session was cleared during refresh, discarding the new token");
                log_security_event(SecurityEvent::RefreshFailed {
                    reason: "session cleared while refreshing".to_string(),
                })
                .await;
                return None;
            }
            Err(e) => {
                self.end_session(format!("could not persist refreshed token: {}", e)).await;
                return None;
            }
        }

        log_security_event(SecurityEvent::TokenRefreshed {
            waiters: self.refresh.pending_len(),
        })
        .await;
        Some(token)
    }

    async fn end_session(&self, reason: String) {
        log::warn!("Session refresh failed: {}", reason);
        if let Err(e) = self.sessions.clear().await {
            log::error!("Failed to clear credentials after refresh failure: {}", e);
        }
        log_security_event(SecurityEvent::RefreshFailed { reason }).await;
    }
}
