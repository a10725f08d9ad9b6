use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};

use crate::api::AppState;
use crate::catalog::RouteRequirement;
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;

/// Per-request authority check against the permission catalog.
///
/// Must run after `jwt_auth_middleware`. Exempt routes and uncatalogued
/// paths outside the API prefix pass; an uncatalogued route under the prefix
/// is denied.
pub async fn enforce_authority_middleware(
    State(state): State<AppState>,
    matched: Option<MatchedPath>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(pattern) = matched.as_ref().map(MatchedPath::as_str) else {
        return Ok(next.run(request).await);
    };

    // A catalogued route is enforced wherever it is mounted
    let method = request.method().clone();
    let required = match state.catalog.requirement(&method, pattern) {
        Some(RouteRequirement::Exempt) => return Ok(next.run(request).await),
        Some(RouteRequirement::Authority(required)) => required,
        None if !state.catalog.covers(pattern) => return Ok(next.run(request).await),
        None => {
            warn!("No catalog entry for {} {}, denying", method, pattern);
            return Err(ApiError::forbidden("You are not authorized to access this resource"));
        }
    };

    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::unauthorized("Missing authenticated user"))?;

    if !user.has_authority(&required.name) {
        warn!("{} denied {} on {}", user.email, required.action, required.resource);
        return Err(ApiError::access_denied(&required.resource, &required.action, &required.name));
    }

    debug!("{} granted {}", user.email, required.name);
    Ok(next.run(request).await)
}
