//! User model for login and user management.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored user account.
///
/// Deliberately not `Serialize`: `password` holds the bcrypt hash and must
/// never reach a response. Use [`UserDto`] for output.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// bcrypt hash.
    pub password: String,
    pub enabled: bool,
    /// Space-delimited role names, e.g. `"admin user"`.
    pub roles: String,
}

/// Data required to create a new user. `password` is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub enabled: bool,
    pub roles: String,
}

impl User {
    /// Returns the roles as individual names.
    pub fn role_list(&self) -> Vec<String> {
        self.roles.split_whitespace().map(str::to_string).collect()
    }
}

/// Public-safe user projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub enabled: bool,
    pub roles: String,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            enabled: user.enabled,
            roles: user.roles.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(roles: &str) -> User {
        User {
            id: 1,
            username: "john".to_string(),
            password: "$2b$12$hash".to_string(),
            enabled: true,
            roles: roles.to_string(),
        }
    }

    #[test]
    fn test_role_list_splits_on_whitespace() {
        assert_eq!(user("admin user").role_list(), vec!["admin", "user"]);
        assert_eq!(user("  user ").role_list(), vec!["user"]);
        assert!(user("").role_list().is_empty());
    }

    #[test]
    fn test_dto_has_no_password() {
        let json = serde_json::to_value(UserDto::from(&user("admin"))).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["username"], "john");
        assert_eq!(json["roles"], "admin");
    }
}
