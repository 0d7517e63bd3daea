//! Common test utilities for integration tests
//!
//! Builds the full router over an in-memory store and a recording channel
//! registry, so no database or socket is needed.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use taskdeck_api::app::{build_router, AppState};
use taskdeck_api::config::Config;
use taskdeck_shared::auth::jwt::{create_token, Claims, TokenType};
use taskdeck_shared::models::user::{CreateUser, Role, User};
use taskdeck_shared::notify::recording::Delivery;
use taskdeck_shared::notify::RecordingRegistry;
use taskdeck_shared::store::{MemoryStore, UserStore};
use tower::ServiceExt;

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub registry: Arc<RecordingRegistry>,
    pub app: Router,
    pub config: Config,
}

/// A seeded user and a valid access token for them
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn id(&self) -> String {
        self.user.id.to_string()
    }
}

impl TestContext {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(RecordingRegistry::new());
        let config = Config::for_tests();
        let state = AppState::with_registry(store.clone(), registry.clone(), config.clone());

        Self {
            app: build_router(state),
            store,
            registry,
            config,
        }
    }

    /// Seeds a user directly in the store
    pub async fn user(&self, name: &str, role: Role) -> TestUser {
        let user = self
            .store
            .create_user(CreateUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "not-used".to_string(),
                role,
            })
            .await
            .unwrap();

        let claims = Claims::new(user.id, TokenType::Access);
        let token = create_token(&claims, &self.config.jwt.secret).unwrap();

        TestUser { user, token }
    }

    /// Sends one request through the router; the body is parsed as JSON
    /// (`Value::Null` when it is not JSON)
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Waits for background notification tasks to record `count` deliveries
    pub async fn wait_for_deliveries(&self, count: usize) -> Vec<Delivery> {
        for _ in 0..100 {
            let deliveries = self.registry.deliveries();
            if deliveries.len() >= count {
                return deliveries;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.registry.deliveries()
    }
}
