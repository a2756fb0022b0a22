//! Common test utilities for all integration tests.
//!
//! Builds the full router over an in-memory database, a stub predictor and a manual
//! clock, and offers request helpers driven through `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::{Duration, SubsecRound, Utc};
use ner_curator::{
    api::{build_router, ApiState},
    auth::SigningKey,
    config::{AppConfig, DatabaseConfig},
    domain::Entity,
    services::{SharedPredictor, StaticPredictor},
    storage::{create_pool, DbPool},
    utils::ManualClock,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const SIGNING_KEY: &str = "integration-test-signing-key-0123456789";

pub struct TestApp {
    router: Router,
    pub pool: DbPool,
    pub clock: Arc<ManualClock>,
}

/// Stub predictor answer used across the suites.
pub fn paris_entities() -> Vec<Entity> {
    vec![Entity::new("Ort", 0, 5, 0.9)]
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.signing_key = Some(SigningKey::from(SIGNING_KEY));
    config.database = DatabaseConfig::in_memory();
    config
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(Arc::new(StaticPredictor::new(paris_entities()))).await
}

pub async fn setup_test_app_with(predictor: SharedPredictor) -> TestApp {
    let config = test_config();
    let pool = create_pool(&config.database).await.expect("create sqlite pool");
    // Start part-way through a second so token lifetimes are checked off the boundary.
    let clock = Arc::new(ManualClock::new(Utc::now().trunc_subsecs(0) + Duration::milliseconds(900)));

    let state = ApiState::new(&config, pool.clone(), predictor, clock.clone()).expect("api state");
    let router = build_router(state, &config.server);

    TestApp { router, pool, clock }
}

impl TestApp {
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).expect("serialize body")))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };

        self.router.clone().oneshot(request).await.expect("request")
    }

    /// Send a raw request, for header shapes `send` does not produce.
    pub async fn send_raw(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.expect("request")
    }

    pub async fn register(&self, username: &str, password: &str) -> Response {
        self.send(
            Method::POST,
            "/users/",
            None,
            Some(json!({ "username": username, "password": password })),
        )
        .await
    }

    /// OAuth2 password-form login.
    pub async fn login_form(&self, username: &str, password: &str) -> Response {
        let form = format!("grant_type=password&username={}&password={}", username, password);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form))
            .expect("build request");
        self.send_raw(request).await
    }

    /// Register and log in, returning the access token.
    pub async fn signed_in(&self, username: &str, password: &str) -> String {
        let response = self.register(username, password).await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = self.login_form(username, password).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = read_json(response).await;
        body["access_token"].as_str().expect("access token").to_string()
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await
            .expect("count rows")
    }
}

pub async fn read_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}
