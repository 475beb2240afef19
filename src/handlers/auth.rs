//! Authentication handlers: login, registration, refresh and logout
//!
//! These are the only operations besides the pipeline's own refresh that
//! mutate the session.

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::auth::{Session, User};
use crate::constants::{LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH};
use crate::core::payload::{envelope_data, AuthPayload};
use crate::core::{ApiClient, ApiRequest, SessionSnapshot};
use crate::error::{GuardError, Result};
use crate::security_logger::{log_security_event, SecurityEvent};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub struct AuthHandler {
    client: Arc<ApiClient>,
}

impl AuthHandler {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// Exchange credentials for a session and persist it
    pub async fn login(&self, request: &LoginRequest) -> Result<SessionSnapshot> {
        let body = serde_json::to_value(request)?;
        let response = match self.client.send(&ApiRequest::post(LOGIN_PATH).json(body)).await {
            Ok(response) => response,
            Err(e) => {
                log_security_event(SecurityEvent::LoginFailed { status: e.status() }).await;
                return Err(e);
            }
        };

        let payload = AuthPayload::from_value(&response);
        let (user, token) = match (payload.user, payload.access_token) {
            (Some(user), Some(token)) => (user, token),
            _ => {
                log_security_event(SecurityEvent::LoginFailed { status: None }).await;
                return Err(GuardError::InvalidPayload(
                    "login response is missing the user or access token".to_string(),
                ));
            }
        };

        let user_id = user.id.clone();
        let role = user.role;
        let sessions = self.client.sessions();
        sessions.set_session(Session::authenticated(user, token)).await?;

        log_security_event(SecurityEvent::LoginSucceeded { user_id, role }).await;
        Ok(sessions.snapshot())
    }

    /// Create an account. Does not sign the new user in.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User> {
        let body = serde_json::to_value(request)?;
        let response = self.client.send(&ApiRequest::post(REGISTER_PATH).json(body)).await?;
        Ok(serde_json::from_value(envelope_data(response))?)
    }

    /// Explicit refresh, sharing any refresh already in flight
    pub async fn refresh(&self) -> Result<SessionSnapshot> {
        self.client.refresh_session().await?;
        Ok(self.client.sessions().snapshot())
    }

    /// End the session. The server call is best effort; local credentials
    /// are always cleared, so calling this while signed out is harmless.
    pub async fn logout(&self) -> Result<()> {
        let request = ApiRequest::post(LOGOUT_PATH).json(json!({}));
        if let Err(e) = self.client.send_once(&request).await {
            log::warn!("Logout request failed, clearing local session anyway: {}", e);
        }

        self.client.sessions().clear().await?;
        log_security_event(SecurityEvent::SessionCleared {
            reason: "logout".to_string(),
        })
        .await;
        log::info!("Logged out");
        Ok(())
    }
}
