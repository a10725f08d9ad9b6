use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::api::AppState;
use crate::database::models::user::UserInput;
use crate::database::models::{Role, User};
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::Page;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::assigner::AuthorizationAssigner;

use super::utils::{list_page, match_identity, reject_identity, required};

#[derive(Debug, Serialize)]
pub struct UserDetails {
    #[serde(flatten)]
    pub user: User,
    pub roles: Vec<Role>,
}

fn email(raw: &str) -> Result<String, ApiError> {
    let email = required("email", raw)?;
    if !email.contains('@') {
        return Err(ApiError::invalid_field("email", "must be an email address"));
    }
    Ok(email)
}

/// POST /api/users - Create a user holding the given roles
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<UserDetails> {
    let Json(input) = payload?;
    reject_identity(input.id, input.uuid)?;

    let mut user = User::new(
        email(&input.email)?,
        required("firstName", &input.first_name)?,
        required("lastName", &input.last_name)?,
    );
    user.active = input.active;
    let (user, roles) = AuthorizationAssigner::new(state.store.clone())
        .assign_user_roles(user, &input.roles)
        .await?;

    info!("Created user {} with {} roles", user.email, roles.len());
    Ok(ApiResponse::created(UserDetails { user, roles }))
}

/// PUT /api/users/:uuid - Update a user and replace their roles
pub async fn update(
    State(state): State<AppState>,
    Path(uuid): Path<Uuid>,
    payload: Result<Json<UserInput>, JsonRejection>,
) -> ApiResult<UserDetails> {
    let Json(input) = payload?;
    match_identity(uuid, input.uuid)?;

    let mut user = Repository::<User>::find(state.store.as_ref(), uuid).await?;
    user.email = email(&input.email)?;
    user.first_name = required("firstName", &input.first_name)?;
    user.last_name = required("lastName", &input.last_name)?;
    user.active = input.active;
    let (user, roles) = AuthorizationAssigner::new(state.store.clone())
        .assign_user_roles(user, &input.roles)
        .await?;

    Ok(ApiResponse::success(UserDetails { user, roles }))
}

/// GET /api/users
pub async fn get(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Page<User>> {
    let page = list_page::<User, _>(state.store.as_ref(), &params, &state.config.filter).await?;
    Ok(ApiResponse::success(page))
}

/// GET /api/users/:uuid - User with their roles
pub async fn find_by_id(State(state): State<AppState>, Path(uuid): Path<Uuid>) -> ApiResult<UserDetails> {
    let user = Repository::<User>::find(state.store.as_ref(), uuid).await?;
    let roles = AuthorizationAssigner::new(state.store.clone())
        .user_roles(&user)
        .await?;
    Ok(ApiResponse::success(UserDetails { user, roles }))
}

/// DELETE /api/users/:uuid
pub async fn delete(State(state): State<AppState>, Path(uuid): Path<Uuid>) -> ApiResult<()> {
    Repository::<User>::delete(state.store.as_ref(), uuid).await?;
    info!("Deleted user {}", uuid);
    Ok(ApiResponse::no_content())
}
