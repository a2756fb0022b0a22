//! User account model and the credential request payloads.

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::UserId;

/// Stored representation of a user account. The password hash never leaves storage
/// through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

/// New user creation payload.
#[derive(Clone)]
pub struct NewUser {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        let mut error = ValidationError::new("blank_username");
        error.message = Some("Username cannot be blank".into());
        return Err(error);
    }
    Ok(())
}

/// Registration payload.
#[derive(Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1-150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,
    // Upper bound caps the cost of a single hash.
    #[validate(length(min = 1, max = 128, message = "Password must be 1-128 characters"))]
    pub password: String,
}

/// Login payload, accepted as an OAuth2 password form or as JSON.
#[derive(Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(username: &str, password: &str) -> RegisterRequest {
        RegisterRequest { username: username.into(), password: password.into() }
    }

    #[test]
    fn accepts_simple_credentials() {
        assert!(register("alice", "secret123").validate().is_ok());
    }

    #[test]
    fn rejects_empty_or_blank_username() {
        assert!(register("", "secret123").validate().is_err());
        assert!(register("   ", "secret123").validate().is_err());
    }

    #[test]
    fn rejects_empty_and_oversized_password() {
        assert!(register("alice", "").validate().is_err());
        assert!(register("alice", &"x".repeat(129)).validate().is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!("{:?}", register("alice", "secret123"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("secret123"));

        let login = LoginRequest { username: "alice".into(), password: "secret123".into() };
        assert!(!format!("{login:?}").contains("secret123"));
    }
}
