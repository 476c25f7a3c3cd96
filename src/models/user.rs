//! User model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::User => "user",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    /// Human-chosen identifier, unique
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Argon2 hash
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Sum of every late-return penalty charged to this user
    pub total_penalty: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Create user request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(length(min = 1, message = "Missing required field: id"))]
    pub id: String,
    #[validate(length(min = 1, message = "Missing required field: name"))]
    pub name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub role: Role,
}

/// Update user request
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub role: Option<Role>,
    /// New password, set by an administrator and mailed to the user
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: Option<String>,
}

/// Changes to a user record as handed to the store
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub password_hash: Option<String>,
}

/// User record as handed to the store
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// User list filter
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    pub role: Option<Role>,
}

/// Result of an account creation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatedUser {
    pub user: User,
    /// Whether the generated credentials reached the user's mailbox
    pub credentials_sent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_displays_as_its_slug() {
        assert_eq!(Role::Staff.to_string(), "staff");
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            role: Role::User,
            password: "$argon2id$secret".to_string(),
            total_penalty: Decimal::ZERO,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "user");
    }

    #[test]
    fn create_user_rejects_malformed_email() {
        let request = CreateUser {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "not-an-address".to_string(),
            role: Role::User,
        };
        assert!(request.validate().is_err());
    }
}
