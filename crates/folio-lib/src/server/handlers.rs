//! HTTP endpoint handlers.
//!
//! The four editable resources share one set of generic operations
//! parameterized by [`Entity`] and its [`UpdateForm`]; the router binds
//! them per resource. Articles and categories are read-only and get
//! their own handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::forms::UpdateForm;
use crate::normalize::Value;
use crate::store::{Entity, Filter, Lookup};

use super::envelope::{ApiError, Envelope};
use super::AppState;

pub type ApiResult = std::result::Result<Envelope, ApiError>;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Parse a path or query identifier.
pub fn parse_id(name: &str, raw: &str) -> Result<i64, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::bad_request(format!("{name} is required")));
    }
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("{name} must be an integer")))
}

fn parse_body(body: &[u8]) -> Result<serde_json::Value, ApiError> {
    serde_json::from_slice(body)
        .map_err(|_| ApiError::bad_request("request body must be valid JSON"))
}

// ---------------------------------------------------------------------------
// Editable resources
// ---------------------------------------------------------------------------

pub async fn list_records(state: &AppState, entity: Entity, filter: Option<Filter>) -> ApiResult {
    let records = state.store.list(entity, filter).await.map_err(|e| {
        ApiError::internal(format!("Failed to fetch {}", entity.noun(true)), &e)
    })?;
    Ok(Envelope::ok(&state.normalizer, &Value::Array(records)))
}

pub async fn show_record(state: &AppState, entity: Entity, raw_id: &str) -> ApiResult {
    let id = parse_id("id", raw_id)?;
    find_one(state, entity, &Lookup::Id(id)).await
}

/// Validate `body` against `form` and apply it to the record with `raw_id`.
pub async fn update_record(
    state: &AppState,
    form: &UpdateForm,
    raw_id: &str,
    body: &[u8],
) -> ApiResult {
    let entity = form.entity;
    let id = parse_id("id", raw_id)?;
    let changes = form.apply(&parse_body(body)?)?;

    let updated = state.store.update(entity, id, &changes).await.map_err(|e| {
        ApiError::internal(format!("Failed to update {}", entity.noun(false)), &e)
    })?;
    match updated {
        Some(record) => {
            tracing::info!(entity = %entity, id, "record updated");
            Ok(Envelope::ok(&state.normalizer, &record))
        }
        None => Err(ApiError::NotFound(entity)),
    }
}

pub async fn delete_record(state: &AppState, entity: Entity, raw_id: &str) -> ApiResult {
    let id = parse_id("id", raw_id)?;
    let removed = state.store.delete(entity, id).await.map_err(|e| {
        ApiError::internal(format!("Failed to delete {}", entity.noun(false)), &e)
    })?;
    if !removed {
        return Err(ApiError::NotFound(entity));
    }
    tracing::info!(entity = %entity, id, "record deleted");
    Ok(Envelope::ok(
        &state.normalizer,
        &Value::record([("success", Value::Bool(true))]),
    ))
}

async fn find_one(state: &AppState, entity: Entity, lookup: &Lookup) -> ApiResult {
    let found = state.store.find(entity, lookup).await.map_err(|e| {
        ApiError::internal(format!("Failed to fetch {}", entity.noun(false)), &e)
    })?;
    found
        .map(|record| Envelope::ok(&state.normalizer, &record))
        .ok_or(ApiError::NotFound(entity))
}

// ---------------------------------------------------------------------------
// Articles
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ArticleQuery {
    pub category_id: Option<String>,
}

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticleQuery>,
) -> ApiResult {
    let filter = match query.category_id.as_deref() {
        Some(raw) if !raw.trim().is_empty() => {
            Some(Filter::new("category_id", parse_id("category_id", raw)?))
        }
        _ => None,
    };
    list_records(&state, Entity::Article, filter).await
}

pub async fn show_article(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult {
    find_one(&state, Entity::Article, &Lookup::Slug(slug)).await
}

// ---------------------------------------------------------------------------
// Article categories
// ---------------------------------------------------------------------------

pub async fn list_categories(State(state): State<Arc<AppState>>) -> ApiResult {
    list_records(&state, Entity::ArticleCategory, None).await
}

/// Category by id when `key` is an integer, otherwise by slug.
///
/// An integer key that matches no id is retried as a slug, so all-digit
/// slugs such as `2025` stay reachable.
pub async fn show_category(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult {
    let entity = Entity::ArticleCategory;
    if let Ok(id) = key.parse::<i64>() {
        match find_one(&state, entity, &Lookup::Id(id)).await {
            Err(ApiError::NotFound(_)) => {}
            found => return found,
        }
    }
    find_one(&state, entity, &Lookup::Slug(key)).await
}
