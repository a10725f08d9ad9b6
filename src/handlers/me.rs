use axum::extract::State;
use axum::Extension;

use crate::api::AppState;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::session::{SessionError, SessionGrant, SessionService};

/// GET /api/me, GET /api/userinfo - Caller's current grant, recomputed from the graph
pub async fn user_info(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<SessionGrant> {
    let grant = SessionService::new(state.store.clone())
        .grant_for_uuid(user.uuid)
        .await
        .map_err(|e| match e {
            SessionError::Inactive(email) => ApiError::unauthorized(format!("User {} is not active", email)),
            SessionError::Store(e) => e.into(),
        })?;
    Ok(ApiResponse::success(grant))
}
