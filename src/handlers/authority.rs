use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use uuid::Uuid;

use crate::api::AppState;
use crate::database::models::Authority;
use crate::database::repository::Repository;
use crate::filter::Page;
use crate::middleware::{ApiResponse, ApiResult};

use super::utils::list_page;

/// GET /api/authorities - Registered authorities, open to any authenticated caller
pub async fn get_authorities(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Page<Authority>> {
    let page = list_page::<Authority, _>(state.store.as_ref(), &params, &state.config.filter).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/authorities/:uuid
pub async fn find_by_id(State(state): State<AppState>, Path(uuid): Path<Uuid>) -> ApiResult<Authority> {
    Ok(ApiResponse::success(
        Repository::<Authority>::find(state.store.as_ref(), uuid).await?,
    ))
}
