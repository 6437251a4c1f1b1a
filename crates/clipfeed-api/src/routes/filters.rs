//! Saved feed filters (§4.7 "Saved filters", §6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use clipfeed_models::{Id, SavedFilter, SavedFilterBody};
use serde::Deserialize;
use sqlx::Row;
use validator::Validate;

use crate::error::ApiError;
use crate::extract::ValidatedJson;
use crate::routes::AuthUser;
use crate::state::App;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFilterRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[serde(default)]
    pub body: SavedFilterBody,
}

pub async fn list_filters(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<SavedFilter>>, ApiError> {
    let rows = sqlx::query(
        app.handle
            .query("SELECT id, user_id, name, body, created_at FROM saved_filters WHERE user_id = ?")
            .as_str(),
    )
    .bind(user_id.to_string())
    .fetch_all(app.handle.pool())
    .await?;

    rows.iter().map(row_to_filter).collect::<Result<_, _>>().map(Json)
}

pub async fn create_filter(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateFilterRequest>,
) -> Result<(StatusCode, Json<SavedFilter>), ApiError> {
    let id = Id::new();
    let body_json = serde_json::to_string(&req.body)?;

    sqlx::query(
        app.handle
            .query("INSERT INTO saved_filters (id, user_id, name, body) VALUES (?, ?, ?, ?)")
            .as_str(),
    )
    .bind(id.to_string())
    .bind(user_id.to_string())
    .bind(&req.name)
    .bind(&body_json)
    .execute(app.handle.pool())
    .await?;

    let row = sqlx::query(
        app.handle
            .query("SELECT id, user_id, name, body, created_at FROM saved_filters WHERE id = ?")
            .as_str(),
    )
    .bind(id.to_string())
    .fetch_one(app.handle.pool())
    .await?;

    Ok((StatusCode::CREATED, Json(row_to_filter(&row)?)))
}

pub async fn delete_filter(
    State(app): State<Arc<App>>,
    AuthUser(user_id): AuthUser,
    Path(filter_id): Path<Id>,
) -> Result<StatusCode, ApiError> {
    let owner: Option<String> =
        sqlx::query_scalar(app.handle.query("SELECT user_id FROM saved_filters WHERE id = ?").as_str())
            .bind(filter_id.to_string())
            .fetch_optional(app.handle.pool())
            .await?;
    let Some(owner) = owner else {
        return Err(ApiError::not_found("saved filter not found"));
    };
    if owner.parse::<Id>()? != user_id {
        return Err(ApiError::forbidden_as_not_found("saved filter not found"));
    }

    sqlx::query(app.handle.query("DELETE FROM saved_filters WHERE id = ?").as_str())
        .bind(filter_id.to_string())
        .execute(app.handle.pool())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn row_to_filter(row: &sqlx::any::AnyRow) -> Result<SavedFilter, ApiError> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let body_json: String = row.try_get("body")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(SavedFilter {
        id: id.parse()?,
        user_id: user_id.parse()?,
        name: row.try_get("name")?,
        body: serde_json::from_str(&body_json)?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|err| {
                ApiError::new(axum::http::StatusCode::INTERNAL_SERVER_ERROR, anyhow::anyhow!("malformed timestamp: {err}"))
            })?,
    })
}
