//! Session token issuance and verification.
//!
//! Tokens are HS256 JWTs carrying the username as `sub` and an absolute expiry. They
//! are never stored; validity is decided from the signature and the clock alone.
//!
//! The expiry is kept to the millisecond in `exp_ms`; the registered `exp` claim is the
//! same instant rounded up to a whole second for other JWT consumers.

use std::fmt;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::debug;
use zeroize::Zeroizing;

use crate::errors::{Error, Result};
use crate::utils::clock::{Clock, SharedClock};

/// Minimum signing key length accepted at startup.
pub const MIN_SIGNING_KEY_BYTES: usize = 32;

/// Process-wide HMAC key. Cleared from memory on drop and never printed.
#[derive(Clone)]
pub struct SigningKey(Zeroizing<Vec<u8>>);

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Zeroizing::new(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Reject keys too short to resist offline guessing.
    pub fn check_strength(&self) -> Result<()> {
        if self.0.len() < MIN_SIGNING_KEY_BYTES {
            return Err(Error::config(format!(
                "signing key must be at least {} bytes long",
                MIN_SIGNING_KEY_BYTES
            )));
        }
        Ok(())
    }
}

impl From<&str> for SigningKey {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl From<String> for SigningKey {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

impl<'de> Deserialize<'de> for SigningKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(SigningKey::from)
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Username the token was issued to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Expiration, seconds since the epoch, rounded up
    pub exp: i64,
    /// Expiration, milliseconds since the epoch; takes precedence over `exp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp_ms: Option<i64>,
    /// Issued at, seconds since the epoch
    pub iat: i64,
}

/// Reasons a token fails verification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("token signature or format is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token subject is missing")]
    MissingSubject,
}

impl TokenError {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenError::InvalidSignature => "invalid_signature",
            TokenError::Expired => "expired",
            TokenError::MissingSubject => "missing_subject",
        }
    }
}

/// A freshly issued token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl IssuedToken {
    /// Remaining lifetime in whole seconds, measured from `now`.
    pub fn expires_in(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

/// Issues and verifies signed, time-limited session tokens.
#[derive(Clone)]
pub struct SessionTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    default_ttl: Duration,
    clock: SharedClock,
}

impl fmt::Debug for SessionTokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenService")
            .field("default_ttl", &self.default_ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl SessionTokenService {
    /// Create a token service with the given key, default lifetime and time source.
    pub fn new(key: &SigningKey, default_ttl: Duration, clock: SharedClock) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against `clock`, not the system time jsonwebtoken would use.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();

        Self {
            encoding_key: EncodingKey::from_secret(key.as_bytes()),
            decoding_key: DecodingKey::from_secret(key.as_bytes()),
            validation,
            default_ttl,
            clock,
        }
    }

    pub fn clock(&self) -> &SharedClock {
        &self.clock
    }

    /// Issue a token for `username` that expires `ttl` from now.
    ///
    /// `None` uses the configured lifetime; there is no separate fallback lifetime.
    pub fn issue(&self, username: &str, ttl: Option<Duration>) -> Result<IssuedToken> {
        let now = self.clock.now();
        let exp_ms = ceil_millis(now + ttl.unwrap_or(self.default_ttl));
        let expires_at = Utc
            .timestamp_millis_opt(exp_ms)
            .single()
            .ok_or_else(|| Error::internal("Session token expiry is out of range"))?;

        let claims = Claims {
            sub: Some(username.to_string()),
            exp: (exp_ms + 999).div_euclid(1000),
            exp_ms: Some(exp_ms),
            iat: now.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| Error::internal(format!("Failed to sign session token: {}", e)))?;

        debug!(expires_at = %expires_at, "issued session token");
        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature, format and expiry, returning the subject username.
    pub fn verify(&self, token: &str) -> std::result::Result<String, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::InvalidSignature,
            }
        })?;

        let deadline_ms = data.claims.exp_ms.unwrap_or(data.claims.exp.saturating_mul(1000));
        if self.clock.now().timestamp_millis() >= deadline_ms {
            return Err(TokenError::Expired);
        }

        match data.claims.sub {
            Some(subject) if !subject.is_empty() => Ok(subject),
            _ => Err(TokenError::MissingSubject),
        }
    }
}

/// Milliseconds since the epoch, rounded up so a deadline never lands early.
fn ceil_millis(at: DateTime<Utc>) -> i64 {
    let partial = at.timestamp_subsec_nanos() % 1_000_000 != 0;
    at.timestamp_millis() + i64::from(partial)
}
