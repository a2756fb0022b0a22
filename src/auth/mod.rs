//! Authentication module entry point.
//!
//! Password hashing, session tokens, the credential-backed authentication gate and the
//! axum middleware that applies it.

pub mod gate;
pub mod hashing;
pub mod jwt;
pub mod login_service;
pub mod middleware;
pub mod models;
pub mod user;

pub use gate::AuthGate;
pub use jwt::{Claims, IssuedToken, SessionTokenService, SigningKey, TokenError};
pub use login_service::{LoginOutcome, LoginService};
pub use models::{AuthContext, AuthError};
pub use user::{LoginRequest, RegisterRequest, User};
