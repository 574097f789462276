//! User model, roles and user-facing request/response types.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    models::{check_length, is_valid_email, is_valid_phone},
};

/// Access role of a user.
///
/// Stored as lower-case text in `users.role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Company,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Company => "company",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    /// Case-insensitive so rows written before the enum normalisation still parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "company" => Ok(Role::Company),
            "client" => Ok(Role::Client),
            other => Err(AppError::Validation(format!("unknown role: {other}"))),
        }
    }
}

/// Represents a row of the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub full_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,

    /// Argon2 PHC string. Never serialized.
    pub password_hash: String,

    /// Raw role column, see [`User::role`].
    pub role: String,

    /// Inactive users cannot log in or use existing tokens.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Parsed role. An unrecognised value degrades to the least privileged role.
    pub fn role(&self) -> Role {
        self.role.parse().unwrap_or(Role::Client)
    }
}

/// Request body for `POST /auth/register`.
///
/// The role is not part of the payload: self-registered users are always
/// clients and become company owners through an approved application.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

impl RegisterRequest {
    /// Shape checks. Password strength is checked separately by
    /// [`crate::security::password::check_policy`].
    pub fn validate(&self) -> Result<(), AppError> {
        if !is_valid_email(&self.email) {
            return Err(AppError::Validation("value is not a valid email address".into()));
        }
        check_length("full_name", &self.full_name, 2, 100)?;
        if let Some(phone) = &self.phone {
            if !is_valid_phone(phone) {
                return Err(AppError::Validation("phone must be in international format".into()));
            }
        }
        Ok(())
    }
}

/// Request body for `PATCH /users/{id}`. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.full_name {
            check_length("full_name", name, 2, 100)?;
        }
        if let Some(email) = &self.email {
            if !is_valid_email(email) {
                return Err(AppError::Validation("value is not a valid email address".into()));
            }
        }
        if let Some(phone) = &self.phone {
            if !is_valid_phone(phone) {
                return Err(AppError::Validation("phone must be in international format".into()));
            }
        }
        Ok(())
    }

    /// Names of the fields present in the request, for audit logging.
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.full_name.is_some() {
            fields.push("full_name");
        }
        if self.email.is_some() {
            fields.push("email");
        }
        if self.phone.is_some() {
            fields.push("phone");
        }
        if self.role.is_some() {
            fields.push("role");
        }
        if self.is_active.is_some() {
            fields.push("is_active");
        }
        fields
    }
}

/// Query parameters for `GET /users`.
#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    /// Case-insensitive substring of name or e-mail.
    pub search: Option<String>,
}

/// Public representation of a user. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            role: user.role(),
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            phone: user.phone,
            is_active: user.is_active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(email: &str, name: &str, phone: Option<&str>) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            full_name: name.to_string(),
            phone: phone.map(str::to_string),
            password: "Password123".to_string(),
        }
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Company".parse::<Role>().unwrap(), Role::Company);
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn register_request_validation() {
        assert!(register("new@test.com", "New User", Some("+9876543210")).validate().is_ok());
        assert!(matches!(
            register("not-an-email", "New User", None).validate(),
            Err(AppError::Validation(_))
        ));
        assert!(register("new@test.com", "N", None).validate().is_err());
        assert!(register("new@test.com", "New User", Some("012")).validate().is_err());
    }

    #[test]
    fn response_hides_password_and_parses_role() {
        let user = User {
            id: 7,
            full_name: Some("Legacy Admin".into()),
            email: "legacy@test.com".into(),
            phone: None,
            password_hash: "$argon2id$secret".into(),
            role: "ADMIN".into(),
            is_active: true,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(UserResponse::from(user)).unwrap();
        assert_eq!(json["role"], "admin");
        assert!(json.get("password_hash").is_none());
    }

    #[test]
    fn changed_fields_lists_present_fields() {
        let update = UpdateUserRequest {
            email: Some("x@test.com".into()),
            is_active: Some(false),
            ..Default::default()
        };
        assert_eq!(update.changed_fields(), vec!["email", "is_active"]);
    }
}
