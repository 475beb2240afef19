use serde::{Deserialize, Serialize};

use super::role::Role;

/// Account status as reported by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Active,
    Suspended,
}

/// Represents an authenticated user. Only `role` is required when decoding;
/// auth responses do not always carry the full profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    #[serde(default)]
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Email address
    #[serde(default)]
    pub email: String,
    /// Platform role
    pub role: Role,
    /// Account status, when the API includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
}

impl User {
    pub fn new(id: impl Into<String>, name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: email.into(),
            role,
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_without_status() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "name": "Ada",
            "email": "ada@example.com",
            "role": "INSTRUCTOR"
        }))
        .unwrap();
        assert_eq!(user.role, Role::Instructor);
        assert_eq!(user.status, None);
    }

    #[test]
    fn test_role_only_user() {
        let user: User = serde_json::from_value(json!({"role": "ADMIN"})).unwrap();
        assert_eq!(user.role, Role::Admin);
        assert!(user.id.is_empty());
        assert!(serde_json::from_value::<User>(json!({"id": "x"})).is_err());
    }

    #[test]
    fn test_suspended_status() {
        let user: User = serde_json::from_value(json!({
            "id": "u2",
            "name": "Bob",
            "email": "bob@example.com",
            "role": "STUDENT",
            "status": "SUSPENDED"
        }))
        .unwrap();
        assert_eq!(user.status, Some(UserStatus::Suspended));
    }
}
