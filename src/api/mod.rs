//! Router assembly.
//!
//! Every API handler is mounted through `ApiRoutes`, so the route table the
//! permission catalog is built from is the router itself. Routes outside the
//! API prefix (`/`, `/health`) are mounted directly and never enforced.
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::{ApiRoutes, PermissionCatalog};
use crate::config::AppConfig;
use crate::database::store::GraphStore;
use crate::handlers::{authority, me, menu_group, menu_item, role, user};
use crate::middleware::{enforce_authority_middleware, jwt_auth_middleware};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GraphStore>,
    pub catalog: Arc<PermissionCatalog>,
    pub config: Arc<AppConfig>,
}

/// Every handler under the API prefix, by owning component and action
pub fn api_routes(prefix: &str) -> ApiRoutes<AppState> {
    ApiRoutes::new(prefix)
        .resource("RoleResource", |r| {
            r.post("/roles", "create", role::create)
                .put("/roles/:uuid", "update", role::update)
                .get("/roles", "get", role::get)
                .get("/roles/:uuid", "findById", role::find_by_id)
                .delete("/roles/:uuid", "delete", role::delete)
                .post("/roles/assign-authorities", "assignAuthorities", role::assign_authorities)
        })
        .resource("MenuGroupResource", |r| {
            r.post("/menu-groups", "create", menu_group::create)
                .put("/menu-groups/:uuid", "update", menu_group::update)
                .get("/menu-groups", "get", menu_group::get)
                .get("/menu-groups/:uuid", "findById", menu_group::find_by_id)
                .delete("/menu-groups/:uuid", "delete", menu_group::delete)
        })
        .resource("MenuItemResource", |r| {
            r.post("/menu-items", "create", menu_item::create)
                .put("/menu-items/:uuid", "update", menu_item::update)
                .get("/menu-items", "get", menu_item::get)
                .get("/menu-items/:uuid", "findById", menu_item::find_by_id)
                .delete("/menu-items/:uuid", "delete", menu_item::delete)
                .post(
                    "/menu-items/assign-authorities",
                    "assignAuthorities",
                    menu_item::assign_authorities,
                )
        })
        .resource("UserResource", |r| {
            r.post("/users", "create", user::create)
                .put("/users/:uuid", "update", user::update)
                .get("/users", "get", user::get)
                .get("/users/:uuid", "findById", user::find_by_id)
                .delete("/users/:uuid", "delete", user::delete)
        })
        .resource("AuthorityResource", |r| {
            r.get("/authorities", "getAuthorities", authority::get_authorities)
                .exempt()
                .get("/authorities/:uuid", "findById", authority::find_by_id)
        })
        .resource("UserInfoResource", |r| {
            r.get_many(&["/me", "/userinfo"], "userInfo", me::user_info)
                .exempt()
        })
}

/// Catalog of the routes `build` would mount, without a store
pub fn catalog(config: &AppConfig) -> PermissionCatalog {
    let (table, _) = api_routes(&config.service.api_prefix).into_parts();
    PermissionCatalog::build(&table, &config.service.api_prefix, &config.service.resource_suffix)
}

pub fn build(config: Arc<AppConfig>, store: Arc<dyn GraphStore>) -> (Router, AppState) {
    let prefix = config.service.api_prefix.clone();
    let (table, api) = api_routes(&prefix).into_parts();
    let catalog = PermissionCatalog::build(&table, &prefix, &config.service.resource_suffix);

    let state = AppState {
        store,
        catalog: Arc::new(catalog),
        config: config.clone(),
    };

    // Layers run outermost first: authenticate, then enforce
    let api = api
        .route_layer(from_fn_with_state(state.clone(), enforce_authority_middleware))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(api)
        .layer(TraceLayer::new_for_http());

    if config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    (router.with_state(state.clone()), state)
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Authority API",
            "version": env!("CARGO_PKG_VERSION"),
            "service": state.config.service.service_name,
            "environment": state.config.environment,
            "api": state.catalog.prefix(),
            "routes": state.catalog.len(),
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": state.store.backend_name()
                }
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "store unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "store": state.store.backend_name()
                    }
                })),
            )
        }
    }
}
