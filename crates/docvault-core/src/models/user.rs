use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;

/// Access level attached to an authenticated identity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    Admin,
    User,
}

impl UserLevel {
    /// Map a stored level string; anything other than `admin` is a regular user.
    pub fn from_stored(level: &str) -> Self {
        if level.trim().eq_ignore_ascii_case("admin") {
            UserLevel::Admin
        } else {
            UserLevel::User
        }
    }
}

impl Display for UserLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            UserLevel::Admin => write!(f, "admin"),
            UserLevel::User => write!(f, "user"),
        }
    }
}

/// Identity returned by a successful credential check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub level: UserLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_level_from_stored() {
        assert_eq!(UserLevel::from_stored("admin"), UserLevel::Admin);
        assert_eq!(UserLevel::from_stored(" Admin "), UserLevel::Admin);
        assert_eq!(UserLevel::from_stored("user"), UserLevel::User);
        assert_eq!(UserLevel::from_stored("auditor"), UserLevel::User);
    }

    #[test]
    fn test_user_level_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&UserLevel::Admin).unwrap(), "\"admin\"");
        assert_eq!(UserLevel::User.to_string(), "user");
    }
}
