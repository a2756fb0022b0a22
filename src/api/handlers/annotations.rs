//! Annotation handlers: predict, save, list and fetch.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::AuthContext;
use crate::domain::{AnnotationDraft, AnnotationId, AnnotationRecord, Entity};

#[derive(Debug, Clone, Deserialize)]
pub struct AnnotateBody {
    pub text: String,
}

/// Reviewed annotation submitted for storage. `curated_annotations` left out means
/// "not curated"; an empty list means "curated, nothing kept".
#[derive(Debug, Clone, Deserialize)]
pub struct SaveAnnotationBody {
    pub original_text: String,
    pub model_annotations: Vec<Entity>,
    #[serde(default)]
    pub curated_annotations: Option<Vec<Entity>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveAnnotationResponse {
    pub message: &'static str,
    pub id: AnnotationId,
}

pub async fn annotate_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<AnnotateBody>,
) -> Result<Json<AnnotationDraft>, ApiError> {
    let draft = state.annotations.annotate(&payload.text, &context).await?;
    Ok(Json(draft))
}

pub async fn save_annotation_handler(
    State(state): State<ApiState>,
    Extension(context): Extension<AuthContext>,
    Json(payload): Json<SaveAnnotationBody>,
) -> Result<(StatusCode, Json<SaveAnnotationResponse>), ApiError> {
    let record = state
        .annotations
        .save(
            &context,
            payload.original_text,
            payload.model_annotations,
            payload.curated_annotations,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SaveAnnotationResponse { message: "Annotation saved successfully", id: record.id }),
    ))
}

pub async fn list_annotations_handler(
    State(state): State<ApiState>,
) -> Result<Json<Vec<AnnotationRecord>>, ApiError> {
    Ok(Json(state.annotations.list().await?))
}

pub async fn get_annotation_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<AnnotationRecord>, ApiError> {
    let id = AnnotationId::parse(&id)
        .map_err(|_| ApiError::NotFound(format!("Annotation '{}' not found", id)))?;
    Ok(Json(state.annotations.get(&id).await?))
}
