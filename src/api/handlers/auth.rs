//! Registration, login and identity handlers.

use axum::{
    extract::{FromRequest, Request, State},
    http::{header, StatusCode},
    Extension, Form, Json,
};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::{AuthContext, LoginRequest, RegisterRequest, User};
use crate::utils::clock::Clock;

/// OAuth2 password-grant token response.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Login credentials sent either as an OAuth2 password form or as JSON.
pub struct LoginCredentials(pub LoginRequest);

impl<S> FromRequest<S> for LoginCredentials
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|content_type| content_type.starts_with("application/json"));

        if is_json {
            let Json(body) = Json::<LoginRequest>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
            Ok(Self(body))
        } else {
            let Form(body) = Form::<LoginRequest>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
            Ok(Self(body))
        }
    }
}

pub async fn register_handler(
    State(state): State<ApiState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.login.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn token_handler(
    State(state): State<ApiState>,
    LoginCredentials(credentials): LoginCredentials,
) -> Result<Json<TokenResponse>, ApiError> {
    let outcome = state.login.login(credentials).await?;
    let expires_in = outcome.token.expires_in(state.tokens.clock().now());

    Ok(Json(TokenResponse {
        access_token: outcome.token.token,
        token_type: "bearer",
        expires_in,
    }))
}

pub async fn current_user_handler(Extension(context): Extension<AuthContext>) -> Json<User> {
    Json(User { id: context.user_id, username: context.username })
}
