#![allow(dead_code)]

use std::sync::Arc;

use anyhow::{Context, Result};
use authority_api::api::AppState;
use authority_api::auth::{generate_jwt, Claims};
use authority_api::cli;
use authority_api::config::AppConfig;
use authority_api::database::{GraphStore, MemoryStore};
use authority_api::services::session::SessionService;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_EMAIL: &str = "admin@localhost";

/// The real router over a fresh in-memory store, after the same startup
/// passes `serve` runs
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub config: Arc<AppConfig>,
}

pub async fn spawn_app() -> Result<TestApp> {
    spawn_app_with(AppConfig::development()).await
}

pub async fn spawn_app_with(config: AppConfig) -> Result<TestApp> {
    spawn_app_on(config, Arc::new(MemoryStore::new())).await
}

pub async fn spawn_app_on(config: AppConfig, store: Arc<dyn GraphStore>) -> Result<TestApp> {
    let config = Arc::new(config);
    let (router, state) = cli::prepare_with_store(config.clone(), store)
        .await
        .context("startup failed")?;
    Ok(TestApp { router, state, config })
}

impl TestApp {
    /// Token for a caller that exists only in the token
    pub fn token_with(&self, authorities: &[&str]) -> Result<String> {
        let claims = Claims::new(
            Uuid::new_v4(),
            "tester@example.com".to_string(),
            999,
            vec![],
            authorities.iter().map(|a| a.to_string()).collect(),
            &self.config.security,
        );
        Ok(generate_jwt(&claims, &self.config.security)?)
    }

    /// Token carrying the stored user's current grant
    pub async fn token_for(&self, email: &str) -> Result<String> {
        let grant = SessionService::new(self.state.store.clone())
            .grant_for_email(email)
            .await?;
        Ok(generate_jwt(
            &Claims::for_grant(&grant, &self.config.security),
            &self.config.security,
        )?)
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.token_for(ADMIN_EMAIL).await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Ok((status, value))
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// External id of a registered authority, looked up by name
    pub async fn authority_uuid(&self, name: &str) -> Result<String> {
        let authority = self
            .state
            .store
            .find_authority_by_name(name)
            .await?
            .with_context(|| format!("authority {} not registered", name))?;
        Ok(authority.external_id.to_string())
    }
}

/// `data` of a success envelope
pub fn data(payload: &Value) -> &Value {
    &payload["data"]
}

/// Names of the `authorities` array of a details payload, sorted
pub fn authority_names(details: &Value) -> Vec<String> {
    let mut names: Vec<String> = details["authorities"]
        .as_array()
        .map(|list| {
            list.iter()
                .filter_map(|a| a["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}
