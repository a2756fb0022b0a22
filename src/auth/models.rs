//! Authenticated identity and the failures that can occur while resolving it.

use thiserror::Error;

use crate::auth::jwt::TokenError;
use crate::auth::user::User;
use crate::domain::UserId;
use crate::errors::Error;

/// Identity attached to a request once its bearer token has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub username: String,
}

impl From<User> for AuthContext {
    fn from(user: User) -> Self {
        Self { user_id: user.id, username: user.username }
    }
}

/// Why a bearer token could not be resolved. Only logs and metrics see the detail;
/// callers get [`Error::Unauthenticated`] for every variant except `Unavailable`.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingBearer,
    #[error("malformed authorization header")]
    MalformedBearer,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("token subject does not match a known user")]
    UnknownUser,
    #[error("credential store unavailable: {0}")]
    Unavailable(#[source] Error),
}

impl AuthError {
    /// Metric label for this failure.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthError::MissingBearer => "missing_bearer",
            AuthError::MalformedBearer => "malformed",
            AuthError::Token(err) => err.as_str(),
            AuthError::UnknownUser => "unknown_user",
            AuthError::Unavailable(_) => "error",
        }
    }
}

impl From<Error> for AuthError {
    fn from(err: Error) -> Self {
        AuthError::Unavailable(err)
    }
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unavailable(inner) => inner,
            _ => Error::Unauthenticated,
        }
    }
}
