use serde::{Deserialize, Serialize};

use super::role::Role;
use super::user::User;

/// Session credentials as persisted by a credential store.
///
/// `role` is kept next to the token as a separate tag so route decisions can
/// be made before the full user object is available again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub role: Option<Role>,
}

impl Session {
    /// The empty session (signed out)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Session populated from a login or refresh response
    pub fn authenticated(user: User, access_token: impl Into<String>) -> Self {
        let role = Some(user.role);
        Self {
            user: Some(user),
            access_token: Some(access_token.into()),
            role,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.access_token.is_none() && self.role.is_none()
    }

    /// Role of the loaded user, falling back to the persisted role tag
    pub fn effective_role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role).or(self.role)
    }
}
