//! Password hashing.
//!
//! New hashes are Argon2id PHC strings. Verification also accepts bcrypt hashes written
//! by earlier deployments of the service.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::errors::{Error, Result};

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

pub fn password_hasher() -> Result<Argon2<'static>> {
    // Argon2id sized for interactive logins: 19 MiB, two passes, one lane.
    const MEMORY_COST_KIB: u32 = 19 * 1024;
    const ITERATIONS: u32 = 2;
    const PARALLELISM: u32 = 1;
    let params = Params::new(MEMORY_COST_KIB, ITERATIONS, PARALLELISM, Some(32))
        .map_err(|err| Error::internal(format!("Invalid Argon2 parameters: {}", err)))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = password_hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| Error::internal(format!("Failed to hash password: {}", err)))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored hash.
///
/// Returns `Ok(false)` on mismatch. A stored value that is not a recognised hash
/// format is an error, never a panic.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    if is_bcrypt(stored) {
        return bcrypt::verify(password, stored)
            .map_err(|err| Error::internal(format!("Invalid bcrypt hash: {}", err)));
    }

    let parsed = PasswordHash::new(stored)
        .map_err(|err| Error::internal(format!("Invalid password hash: {}", err)))?;
    Ok(password_hasher()?.verify_password(password.as_bytes(), &parsed).is_ok())
}

fn is_bcrypt(stored: &str) -> bool {
    BCRYPT_PREFIXES.iter().any(|prefix| stored.starts_with(prefix))
}

/// [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|err| Error::internal(format!("Password hashing task failed: {}", err)))?
}

/// [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(password: String, stored: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|err| Error::internal(format!("Password verification task failed: {}", err)))?
}
