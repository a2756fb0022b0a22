use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::{middleware::authenticate, AuthGate, LoginService, SessionTokenService};
use crate::config::{AppConfig, ServerConfig};
use crate::errors::Result;
use crate::services::{AnnotationService, SharedPredictor};
use crate::storage::{DbPool, SqlxAnnotationRepository, SqlxUserRepository};
use crate::utils::clock::SharedClock;

use super::handlers::{
    annotate_handler, current_user_handler, get_annotation_handler, health_handler,
    list_annotations_handler, register_handler, save_annotation_handler, token_handler,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct ApiState {
    pub login: Arc<LoginService>,
    pub tokens: Arc<SessionTokenService>,
    pub gate: Arc<AuthGate>,
    pub annotations: Arc<AnnotationService>,
    pub pool: DbPool,
}

impl ApiState {
    /// Wire the services from validated configuration.
    pub fn new(
        config: &AppConfig,
        pool: DbPool,
        predictor: SharedPredictor,
        clock: SharedClock,
    ) -> Result<Self> {
        let key = config.auth.require_signing_key()?;
        key.check_strength()?;
        let tokens = Arc::new(SessionTokenService::new(key, config.auth.token_ttl(), clock.clone()));

        let users = Arc::new(SqlxUserRepository::new(pool.clone()));
        let login = Arc::new(LoginService::new(users.clone(), tokens.clone()));
        let gate = Arc::new(AuthGate::new(tokens.clone(), users));

        let repository = Arc::new(SqlxAnnotationRepository::new(pool.clone(), clock));
        let annotations =
            Arc::new(AnnotationService::new(repository, predictor, &config.predictor));

        Ok(Self { login, tokens, gate, annotations, pool })
    }
}

pub fn build_router(state: ApiState, server: &ServerConfig) -> Router {
    let auth_layer = middleware::from_fn_with_state(state.gate.clone(), authenticate);

    // Trailing-slash paths are the ones existing clients call.
    let secured_api = Router::new()
        .route("/users/me", get(current_user_handler))
        .route("/annotate", post(annotate_handler))
        .route("/annotate/", post(annotate_handler))
        .route("/annotations", get(list_annotations_handler).post(save_annotation_handler))
        .route("/annotations/", get(list_annotations_handler).post(save_annotation_handler))
        .route("/annotations/{id}", get(get_annotation_handler))
        .route_layer(auth_layer);

    let public_api = Router::new()
        .route("/users", post(register_handler))
        .route("/users/", post(register_handler))
        .route("/token", post(token_handler))
        .route("/health", get(health_handler));

    let mut router = Router::new()
        .merge(public_api)
        .merge(secured_api)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(server.max_body_size))
        .layer(TraceLayer::new_for_http());

    if server.enable_cors {
        router = router.layer(cors_layer(&server.cors_origins));
    }

    router
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(parsed)
}
