//! Paste handlers.

use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::warn;

use crate::application::pastes::CreatePasteRequest;

use super::error::ApiError;
use super::models::{
    CreatePasteBody, HealthResponse, ListQuery, PasteCreatedResponse, PasteResponse,
    UpdatePasteBody,
};
use super::state::AppState;

pub async fn create_paste(
    State(state): State<AppState>,
    Json(body): Json<CreatePasteBody>,
) -> Result<impl IntoResponse, ApiError> {
    let created = state
        .pastes
        .create(CreatePasteRequest {
            content: body.content,
            tags: body.tags,
            auto_tag: body.auto_tag,
            expires_in: body.expires_in_seconds.map(Duration::from_secs),
        })
        .await?;

    let response = PasteCreatedResponse {
        paste: created.paste.into(),
        edit_token: created.edit_token,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn get_paste(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PasteResponse>, ApiError> {
    let paste = state.pastes.get(&slug).await?;
    Ok(Json(paste.into()))
}

pub async fn update_paste(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(body): Json<UpdatePasteBody>,
) -> Result<Json<PasteResponse>, ApiError> {
    let paste = state
        .pastes
        .update(&slug, &body.edit_token, body.content, body.tags)
        .await?;
    Ok(Json(paste.into()))
}

pub async fn list_top(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PasteResponse>>, ApiError> {
    let pastes = state.pastes.list_top(query.limit.unwrap_or(0)).await?;
    Ok(Json(pastes.into_iter().map(Into::into).collect()))
}

pub async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<PasteResponse>>, ApiError> {
    let pastes = state.pastes.list_recent(query.limit.unwrap_or(0)).await?;
    Ok(Json(pastes.into_iter().map(Into::into).collect()))
}

pub async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    if let Err(error) = state.db.health_check().await {
        warn!(%error, "health check failed");
        return Err(ApiError::db_unavailable());
    }
    Ok(Json(HealthResponse { status: "ok" }))
}
