use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::AppState;
use crate::database::models::role::RoleInput;
use crate::database::models::Role;
use crate::database::repository::Repository;
use crate::filter::Page;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::assigner::{AuthorizationAssigner, RoleAuthorities};

use super::utils::{list_page, match_identity, reject_identity, required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAuthorities {
    pub uuid: Uuid,
    #[serde(default)]
    pub authority_ids: Vec<Uuid>,
    /// Expected role version; stale values are rejected with 409
    pub version: Option<i32>,
}

/// POST /api/roles - Create a role
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<RoleInput>, JsonRejection>,
) -> ApiResult<Role> {
    let Json(input) = payload?;
    reject_identity(input.id, input.uuid)?;

    let role = Role::new(required("name", &input.name)?, required("code", &input.code)?);
    let role = Repository::<Role>::insert(state.store.as_ref(), role).await?;

    info!("Created role {}", role.code);
    Ok(ApiResponse::created(role))
}

/// PUT /api/roles/:uuid - Update name and code of a role
pub async fn update(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    payload: Result<Json<RoleInput>, JsonRejection>,
) -> ApiResult<Role> {
    let Json(input) = payload?;
    match_identity(uuid, input.uuid)?;

    let mut role = Repository::<Role>::find(state.store.as_ref(), uuid).await?;
    role.name = required("name", &input.name)?;
    role.code = required("code", &input.code)?;

    Ok(ApiResponse::success(Repository::<Role>::update(state.store.as_ref(), role).await?))
}

/// GET /api/roles - Paged, filtered role list
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Page<Role>> {
    let page = list_page::<Role, _>(state.store.as_ref(), &params, &state.config.filter).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/roles/:uuid - Role with its authorities
pub async fn find_by_id(State(state): State<AppState>, Path(uuid): Path<Uuid>) -> ApiResult<RoleAuthorities> {
    let details = AuthorizationAssigner::new(state.store.clone())
        .role_authorities(uuid)
        .await?;
    Ok(ApiResponse::success(details))
}

/// DELETE /api/roles/:uuid
pub async fn delete(State(state): State<AppState>, Path(uuid): Path<Uuid>) -> ApiResult<()> {
    Repository::<Role>::delete(state.store.as_ref(), uuid).await?;
    info!("Deleted role {}", uuid);
    Ok(ApiResponse::no_content())
}

/// POST /api/roles/assign-authorities - Replace the authority set of a role
pub async fn assign_authorities(
    State(state): State<AppState>,
    payload: Result<Json<AssignAuthorities>, JsonRejection>,
) -> ApiResult<RoleAuthorities> {
    let Json(request) = payload?;
    let details = AuthorizationAssigner::new(state.store.clone())
        .assign_role_authorities(request.uuid, &request.authority_ids, request.version)
        .await?;
    Ok(ApiResponse::success(details))
}
