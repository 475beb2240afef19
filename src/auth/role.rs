use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform-wide roles. Serialized as the upper-case tags the API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Instructor,
    Student,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::SuperAdmin, Role::Admin, Role::Instructor, Role::Student];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Admin => "ADMIN",
            Role::Instructor => "INSTRUCTOR",
            Role::Student => "STUDENT",
        }
    }

    /// Membership rule for route access: a role is permitted if it is listed,
    /// or if it is SUPER_ADMIN and ADMIN is listed. ADMIN does not inherit
    /// SUPER_ADMIN access.
    pub fn is_permitted(&self, allowed: &[Role]) -> bool {
        allowed.contains(self) || (*self == Role::SuperAdmin && allowed.contains(&Role::Admin))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role tag is not one of the four known roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "ADMIN" => Ok(Role::Admin),
            "INSTRUCTOR" => Ok(Role::Instructor),
            "STUDENT" => Ok(Role::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_super_admin_inherits_admin() {
        assert!(Role::SuperAdmin.is_permitted(&[Role::Admin]));
        assert!(!Role::Admin.is_permitted(&[Role::SuperAdmin]));
        assert!(Role::Admin.is_permitted(&[Role::Admin]));
    }

    #[test]
    fn test_no_other_inheritance() {
        assert!(!Role::SuperAdmin.is_permitted(&[Role::Instructor]));
        assert!(!Role::Instructor.is_permitted(&[Role::Student]));
        assert!(!Role::Student.is_permitted(&[]));
    }

    #[test]
    fn test_tag_parsing() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>(), Ok(role));
        }
        assert!("admin".parse::<Role>().is_err());
        assert_eq!(
            serde_json::to_string(&Role::SuperAdmin).unwrap(),
            "\"SUPER_ADMIN\""
        );
    }
}
