//! Tag handlers

use crate::error::AppError;
use crate::state::AppState;
use crate::tags::{Tag, TagUpdate};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
}

/// List active tags ordered by name
pub async fn list_tags(State(state): State<Arc<AppState>>) -> Json<Vec<Tag>> {
    Json(state.tags.list_active().await)
}

pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tag>, AppError> {
    state
        .tags
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Tag".to_string()))
}

/// Create a tag (admin only)
///
/// * `201 Created` - The new tag
/// * `400 Bad Request` - Empty name
/// * `409 Conflict` - Name already taken
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let tag = state.tags.create(&request.name).await?;
    tracing::info!(tag_id = %tag.id, name = %tag.name, "tag created");
    Ok((StatusCode::CREATED, Json(tag)))
}

/// Rename a tag and/or toggle its active flag (admin only)
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<TagUpdate>,
) -> Result<Json<Tag>, AppError> {
    let tag = state.tags.update(id, update).await?;
    Ok(Json(tag))
}

/// Soft-delete a tag (admin only)
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Tag>, AppError> {
    let tag = state.tags.deactivate(id).await?;
    tracing::info!(tag_id = %tag.id, "tag deactivated");
    Ok(Json(tag))
}
