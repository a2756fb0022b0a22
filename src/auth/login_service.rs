//! Registration and username/password login.

use std::sync::{Arc, LazyLock};

use tracing::{info, instrument, warn};
use validator::Validate;

use crate::auth::hashing;
use crate::auth::jwt::{IssuedToken, SessionTokenService};
use crate::auth::user::{LoginRequest, NewUser, RegisterRequest, User};
use crate::domain::UserId;
use crate::errors::{Error, Result};
use crate::observability::metrics;
use crate::storage::UserRepository;

/// Hash verified against when the username does not exist, so an unknown user costs
/// the same as a wrong password. Only dereferenced on the blocking pool.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hashing::hash_password("dummy_startup_value")
        .unwrap_or_else(|_| "$argon2id$v=19$m=19456,t=2,p=1$dW5rbm93bg$dW5rbm93bg".to_string())
});

/// Run one verification against [`DUMMY_HASH`], initialising it first if needed,
/// entirely on the blocking pool.
async fn verify_against_dummy(password: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || hashing::verify_password(&password, &DUMMY_HASH))
        .await
        .map_err(|err| Error::internal(format!("Password verification task failed: {}", err)))?
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user: User,
    pub token: IssuedToken,
}

#[derive(Clone)]
pub struct LoginService {
    user_repository: Arc<dyn UserRepository>,
    tokens: Arc<SessionTokenService>,
}

impl LoginService {
    pub fn new(user_repository: Arc<dyn UserRepository>, tokens: Arc<SessionTokenService>) -> Self {
        Self { user_repository, tokens }
    }

    /// Create an account. The uniqueness check is the storage constraint, so two
    /// concurrent registrations of one name leave exactly one user.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        if let Err(errors) = request.validate() {
            metrics::record_registration("invalid").await;
            return Err(errors.into());
        }

        let RegisterRequest { username, password } = request;
        let password_hash = hashing::hash_password_blocking(password).await?;

        let result = self
            .user_repository
            .create_user(NewUser { id: UserId::new(), username, password_hash })
            .await;

        match result {
            Ok(user) => {
                metrics::record_registration("success").await;
                info!(user_id = %user.id, "user registered");
                Ok(user)
            }
            Err(Error::DuplicateUsername) => {
                metrics::record_registration("duplicate").await;
                warn!("registration rejected: username already taken");
                Err(Error::DuplicateUsername)
            }
            Err(err) => {
                metrics::record_registration("error").await;
                Err(err)
            }
        }
    }

    /// Check credentials and issue a session token with the configured lifetime.
    ///
    /// Unknown usernames and wrong passwords fail identically with
    /// `InvalidCredentials`.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome> {
        if request.validate().is_err() {
            metrics::record_login("invalid_credentials").await;
            return Err(Error::InvalidCredentials);
        }

        let LoginRequest { username, password } = request;

        let (user, password_hash) =
            match self.user_repository.get_user_with_password(&username).await? {
                Some(found) => found,
                None => {
                    if let Err(e) = verify_against_dummy(password).await {
                        warn!(error = %e, "dummy hash verification failed unexpectedly");
                    }
                    warn!("login attempt for non-existent user");
                    metrics::record_login("invalid_credentials").await;
                    return Err(Error::InvalidCredentials);
                }
            };

        let matches = match hashing::verify_password_blocking(password, password_hash).await {
            Ok(matches) => matches,
            Err(e) => {
                // An unreadable stored hash is treated as a mismatch rather than leaking
                // account state through a different error.
                warn!(user_id = %user.id, error = %e, "stored password hash could not be verified");
                false
            }
        };

        if !matches {
            warn!(user_id = %user.id, "login attempt with incorrect password");
            metrics::record_login("invalid_credentials").await;
            return Err(Error::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.username, None)?;

        metrics::record_login("success").await;
        info!(user_id = %user.id, expires_at = %token.expires_at, "user logged in");

        Ok(LoginOutcome { user, token })
    }
}
