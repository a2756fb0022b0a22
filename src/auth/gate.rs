//! Authentication gate: turns a bearer token into a known user.

use std::sync::Arc;

use tracing::{field, instrument};

use crate::auth::jwt::SessionTokenService;
use crate::auth::models::{AuthContext, AuthError};
use crate::auth::user::User;
use crate::observability::metrics;
use crate::storage::UserRepository;

#[derive(Clone)]
pub struct AuthGate {
    tokens: Arc<SessionTokenService>,
    users: Arc<dyn UserRepository>,
}

impl AuthGate {
    pub fn new(tokens: Arc<SessionTokenService>, users: Arc<dyn UserRepository>) -> Self {
        Self { tokens, users }
    }

    /// Verify `token` and look up its subject. Read-only.
    #[instrument(skip(self, token), fields(username = field::Empty))]
    pub async fn resolve(&self, token: &str) -> std::result::Result<User, AuthError> {
        let username = self.tokens.verify(token)?;
        tracing::Span::current().record("username", username.as_str());

        self.users.find_by_username(&username).await?.ok_or(AuthError::UnknownUser)
    }

    /// Resolve the value of an `Authorization` header.
    pub async fn authenticate(&self, header: &str) -> std::result::Result<AuthContext, AuthError> {
        let outcome = match parse_bearer(header) {
            Ok(token) => self.resolve(token).await.map(AuthContext::from),
            Err(err) => Err(err),
        };

        match &outcome {
            Ok(_) => metrics::record_authentication("success").await,
            Err(err) => metrics::record_authentication(err.as_str()).await,
        }
        outcome
    }
}

/// Extract the token from `Bearer <token>`; the scheme is case-insensitive.
pub fn parse_bearer(header: &str) -> std::result::Result<&str, AuthError> {
    let header = header.trim();
    if header.is_empty() {
        return Err(AuthError::MissingBearer);
    }

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::MalformedBearer)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedBearer);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::MissingBearer);
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{SigningKey, TokenError};
    use crate::auth::user::NewUser;
    use crate::config::DatabaseConfig;
    use crate::domain::UserId;
    use crate::storage::{create_pool, SqlxUserRepository};
    use crate::utils::clock::ManualClock;
    use chrono::{Duration, Utc};

    struct Fixture {
        gate: AuthGate,
        tokens: Arc<SessionTokenService>,
        clock: Arc<ManualClock>,
        alice: User,
    }

    async fn fixture() -> Fixture {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let tokens = Arc::new(SessionTokenService::new(
            &SigningKey::from("gate-test-signing-key-0123456789abcdef"),
            Duration::minutes(30),
            clock.clone(),
        ));
        let users = Arc::new(SqlxUserRepository::new(pool));
        let alice = users
            .create_user(NewUser {
                id: UserId::new(),
                username: "alice".into(),
                password_hash: "unused".into(),
            })
            .await
            .unwrap();

        Fixture { gate: AuthGate::new(tokens.clone(), users), tokens, clock, alice }
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(parse_bearer("Bearer abc").unwrap(), "abc");
        assert_eq!(parse_bearer("bearer  abc ").unwrap(), "abc");
        assert!(matches!(parse_bearer(""), Err(AuthError::MissingBearer)));
        assert!(matches!(parse_bearer("Bearer "), Err(AuthError::MissingBearer)));
        assert!(matches!(parse_bearer("Basic abc"), Err(AuthError::MalformedBearer)));
        assert!(matches!(parse_bearer("abc"), Err(AuthError::MalformedBearer)));
    }

    #[tokio::test]
    async fn valid_token_resolves_to_user() {
        let f = fixture().await;
        let issued = f.tokens.issue("alice", None).unwrap();

        assert_eq!(f.gate.resolve(&issued.token).await.unwrap(), f.alice);
        let context = f.gate.authenticate(&format!("Bearer {}", issued.token)).await.unwrap();
        assert_eq!(context.user_id, f.alice.id);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let f = fixture().await;
        let issued = f.tokens.issue("alice", Some(Duration::minutes(1))).unwrap();
        f.clock.advance(Duration::minutes(2));

        let err = f.gate.resolve(&issued.token).await.unwrap_err();
        assert!(matches!(err, AuthError::Token(TokenError::Expired)));
        assert!(matches!(crate::errors::Error::from(err), crate::errors::Error::Unauthenticated));
    }

    #[tokio::test]
    async fn unknown_subject_is_rejected() {
        let f = fixture().await;
        let issued = f.tokens.issue("mallory", None).unwrap();
        assert!(matches!(f.gate.resolve(&issued.token).await, Err(AuthError::UnknownUser)));
    }

    #[tokio::test]
    async fn garbage_header_is_rejected() {
        let f = fixture().await;
        assert!(f.gate.authenticate("Bearer nonsense").await.is_err());
        assert!(f.gate.authenticate("").await.is_err());
    }
}
