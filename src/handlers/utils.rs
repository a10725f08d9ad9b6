use std::collections::HashMap;

use uuid::Uuid;

use crate::config::FilterConfig;
use crate::database::models::Entity;
use crate::database::repository::Repository;
use crate::error::ApiError;
use crate::filter::{FilterSpecificationBuilder, Page, PageRequest};

/// Paged list over a flat query map. Filter fields and `page`/`size` share
/// the map; keys that are neither are ignored.
pub async fn list_page<T, R>(
    repo: &R,
    params: &HashMap<String, String>,
    filter: &FilterConfig,
) -> Result<Page<T>, ApiError>
where
    T: Entity,
    R: Repository<T> + ?Sized,
{
    let spec = FilterSpecificationBuilder::build::<T>(params);
    let page = PageRequest::from_params(params, filter);
    Ok(repo.find_all(&spec, page).await?)
}

/// Identity is assigned by the store; a create payload must not carry one
pub fn reject_identity(id: Option<i64>, uuid: Option<Uuid>) -> Result<(), ApiError> {
    if id.is_some_and(|id| id != 0) {
        return Err(ApiError::invalid_field("id", "A new record cannot already have an id"));
    }
    if uuid.is_some() {
        return Err(ApiError::invalid_field("uuid", "A new record cannot already have a uuid"));
    }
    Ok(())
}

/// Body identity must be present and agree with the path
pub fn match_identity(path: Uuid, body: Option<Uuid>) -> Result<(), ApiError> {
    match body {
        None => Err(ApiError::invalid_field("uuid", "Missing uuid")),
        Some(body) if body != path => Err(ApiError::invalid_field("uuid", "Path and body uuid differ")),
        Some(_) => Ok(()),
    }
}

pub fn required(field: &str, value: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::invalid_field(field, "must not be blank"));
    }
    Ok(value.to_string())
}
