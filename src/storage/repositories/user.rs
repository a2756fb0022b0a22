//! Credential store.
//!
//! Username uniqueness is enforced by the `UNIQUE(username)` constraint; a violation on
//! insert becomes [`Error::DuplicateUsername`], so concurrent registrations of the same
//! name cannot both succeed.

use crate::auth::user::{NewUser, User};
use crate::domain::UserId;
use crate::errors::{Error, Result};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    pub id: String,
    pub username: String,
}

#[derive(Clone, FromRow)]
struct UserWithHashRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User { id: UserId::from_string(row.id), username: row.username }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user; fails with `DuplicateUsername` if the name is taken
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Exact, case-sensitive lookup
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Lookup returning the stored password hash alongside the user
    async fn get_user_with_password(&self, username: &str) -> Result<Option<(User, String)>>;

    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;

    async fn count_users(&self) -> Result<i64>;
}

#[derive(Debug, Clone)]
pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    #[instrument(skip(self, user), fields(username = %user.username, user_id = %user.id), name = "db_create_user")]
    async fn create_user(&self, user: NewUser) -> Result<User> {
        sqlx::query("INSERT INTO users (id, username, password_hash) VALUES (?, ?, ?)")
            .bind(user.id.as_str())
            .bind(&user.username)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err) {
                    Error::DuplicateUsername
                } else {
                    Error::database(err, "Failed to create user")
                }
            })?;

        Ok(User { id: user.id, username: user.username })
    }

    #[instrument(skip(self), name = "db_find_user_by_username")]
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, username FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to fetch user by username"))?;

        Ok(row.map(User::from))
    }

    #[instrument(skip(self), name = "db_get_user_with_password")]
    async fn get_user_with_password(&self, username: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            "SELECT id, username, password_hash FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| Error::database(err, "Failed to fetch user credentials"))?;

        Ok(row.map(|r| {
            (User { id: UserId::from_string(r.id), username: r.username }, r.password_hash)
        }))
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_get_user")]
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, username FROM users WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to fetch user"))?;

        Ok(row.map(User::from))
    }

    #[instrument(skip(self), name = "db_count_users")]
    async fn count_users(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| Error::database(err, "Failed to count users"))
    }
}
