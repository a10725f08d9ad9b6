use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::api::AppState;
use crate::database::models::menu_item::MenuItemInput;
use crate::database::models::{MenuGroup, MenuItem};
use crate::database::repository::Repository;
use crate::database::store::GraphStore;
use crate::error::ApiError;
use crate::filter::Page;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::assigner::{AuthorizationAssigner, MenuItemAuthorities};

use super::utils::{list_page, match_identity, reject_identity, required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignAuthorities {
    pub uuid: Uuid,
    #[serde(default)]
    pub authority_ids: Vec<Uuid>,
    pub version: Option<i32>,
}

/// Storage id of the referenced group, if any
async fn group_id(store: &dyn GraphStore, group: Option<Uuid>) -> Result<Option<i64>, ApiError> {
    match group {
        Some(uuid) => Ok(Some(Repository::<MenuGroup>::find(store, uuid).await?.id)),
        None => Ok(None),
    }
}

/// POST /api/menu-items
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<MenuItemInput>, JsonRejection>,
) -> ApiResult<MenuItem> {
    let Json(input) = payload?;
    reject_identity(input.id, input.uuid)?;

    let menu_group_id = group_id(state.store.as_ref(), input.menu_group).await?;
    let item = MenuItem::new(
        required("name", &input.name)?,
        input.icon,
        required("route", &input.route)?,
        input.sort_order,
        menu_group_id,
    );
    let item = Repository::<MenuItem>::insert(state.store.as_ref(), item).await?;

    info!("Created menu item {} -> {}", item.name, item.route);
    Ok(ApiResponse::created(item))
}

/// PUT /api/menu-items/:uuid
pub async fn update(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    payload: Result<Json<MenuItemInput>, JsonRejection>,
) -> ApiResult<MenuItem> {
    let Json(input) = payload?;
    match_identity(uuid, input.uuid)?;

    let mut item = Repository::<MenuItem>::find(state.store.as_ref(), uuid).await?;
    item.name = required("name", &input.name)?;
    item.route = required("route", &input.route)?;
    item.icon = input.icon;
    item.sort_order = input.sort_order;
    item.menu_group_id = group_id(state.store.as_ref(), input.menu_group).await?;

    Ok(ApiResponse::success(
        Repository::<MenuItem>::update(state.store.as_ref(), item).await?,
    ))
}

/// GET /api/menu-items
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Page<MenuItem>> {
    let page = list_page::<MenuItem, _>(state.store.as_ref(), &params, &state.config.filter).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/menu-items/:uuid - Menu item with its authorities
pub async fn find_by_id(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<MenuItemAuthorities> {
    let details = AuthorizationAssigner::new(state.store.clone())
        .menu_item_authorities(uuid)
        .await?;
    Ok(ApiResponse::success(details))
}

/// DELETE /api/menu-items/:uuid
pub async fn delete(State(state): State<AppState>, Path(uuid): Path<Uuid>) -> ApiResult<()> {
    Repository::<MenuItem>::delete(state.store.as_ref(), uuid).await?;
    info!("Deleted menu item {}", uuid);
    Ok(ApiResponse::no_content())
}

/// POST /api/menu-items/assign-authorities - Replace the authority set of a menu item
pub async fn assign_authorities(
    State(state): State<AppState>,
    payload: Result<Json<AssignAuthorities>, JsonRejection>,
) -> ApiResult<MenuItemAuthorities> {
    let Json(request) = payload?;
    let details = AuthorizationAssigner::new(state.store.clone())
        .assign_menu_item_authorities(request.uuid, &request.authority_ids, request.version)
        .await?;
    Ok(ApiResponse::success(details))
}
