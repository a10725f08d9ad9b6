use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use tracing::info;
use uuid::Uuid;

use crate::api::AppState;
use crate::database::models::menu_group::MenuGroupInput;
use crate::database::models::MenuGroup;
use crate::database::repository::Repository;
use crate::filter::Page;
use crate::middleware::{ApiResponse, ApiResult};

use super::utils::{list_page, match_identity, reject_identity, required};

/// POST /api/menu-groups
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<MenuGroupInput>, JsonRejection>,
) -> ApiResult<MenuGroup> {
    let Json(input) = payload?;
    reject_identity(input.id, input.uuid)?;

    let group = MenuGroup::new(required("name", &input.name)?, input.icon, input.sort_order);
    let group = Repository::<MenuGroup>::insert(state.store.as_ref(), group).await?;

    info!("Created menu group {}", group.name);
    Ok(ApiResponse::created(group))
}

/// PUT /api/menu-groups/:uuid
pub async fn update(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    payload: Result<Json<MenuGroupInput>, JsonRejection>,
) -> ApiResult<MenuGroup> {
    let Json(input) = payload?;
    match_identity(uuid, input.uuid)?;

    let mut group = Repository::<MenuGroup>::find(state.store.as_ref(), uuid).await?;
    group.name = required("name", &input.name)?;
    group.icon = input.icon;
    group.sort_order = input.sort_order;

    Ok(ApiResponse::success(
        Repository::<MenuGroup>::update(state.store.as_ref(), group).await?,
    ))
}

/// GET /api/menu-groups
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Page<MenuGroup>> {
    let page = list_page::<MenuGroup, _>(state.store.as_ref(), &params, &state.config.filter).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/menu-groups/:uuid
pub async fn find_by_id(State(state): State<AppState>, Path(uuid): Path<Uuid>) -> ApiResult<MenuGroup> {
    Ok(ApiResponse::success(
        Repository::<MenuGroup>::find(state.store.as_ref(), uuid).await?,
    ))
}

/// DELETE /api/menu-groups/:uuid - Refused while items still belong to the group
pub async fn delete(State(state): State<AppState>, Path(uuid): Path<Uuid>) -> ApiResult<()> {
    Repository::<MenuGroup>::delete(state.store.as_ref(), uuid).await?;
    info!("Deleted menu group {}", uuid);
    Ok(ApiResponse::no_content())
}
