//! Axum middleware that runs the authentication gate on protected routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::{field, warn, Instrument};

use crate::api::error::ApiError;
use crate::auth::gate::AuthGate;
use crate::auth::models::AuthError;

pub type AuthGateState = Arc<AuthGate>;

/// Resolve the bearer token and insert the caller's `AuthContext` into the request
/// extensions. Every token failure is answered with the same 401.
pub async fn authenticate(
    State(gate): State<AuthGateState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = crate::auth_span!(method, path);

    async move {
        let header = request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("");

        match gate.authenticate(header).await {
            Ok(context) => {
                tracing::Span::current().record("username", field::display(&context.username));
                request.extensions_mut().insert(context);
                Ok(next.run(request).await)
            }
            Err(err) => {
                warn!(reason = err.as_str(), "authentication failed");
                Err(map_auth_error(err))
            }
        }
    }
    .instrument(span)
    .await
}

fn map_auth_error(err: AuthError) -> ApiError {
    ApiError::from(crate::errors::Error::from(err))
}
