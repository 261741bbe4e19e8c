//! Artifact routes.

use std::collections::HashMap;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::{Artifact, ArtifactDto, Wizard};
use crate::registry::ARTIFACT;
use crate::response::ApiResult;
use crate::state::AppState;
use crate::store::StoreTx;
use crate::validation::Validator;

/// Creates the artifacts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(find_all_artifacts).post(add_artifact))
        .route(
            "/{artifact_id}",
            get(find_artifact).put(update_artifact).delete(delete_artifact),
        )
}

/// Request body for creating or updating an artifact.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

struct ValidArtifact {
    name: String,
    description: String,
    image_url: String,
}

impl ArtifactRequest {
    fn validate(self) -> Result<ValidArtifact, AppError> {
        let mut v = Validator::new();
        let name = v.required("name", self.name);
        let description = v.required("description", self.description);
        let image_url = v.required("imageUrl", self.image_url);
        v.finish()?;
        Ok(ValidArtifact {
            name,
            description,
            image_url,
        })
    }
}

async fn owner_of(tx: &mut dyn StoreTx, artifact: &Artifact) -> Result<Option<Wizard>, AppError> {
    match artifact.owner_id {
        Some(owner_id) => Ok(tx.find_wizard(owner_id).await?),
        None => Ok(None),
    }
}

/// GET /artifacts - List every artifact with its owner.
async fn find_all_artifacts(
    State(state): State<AppState>,
) -> Result<ApiResult<Vec<ArtifactDto>>, AppError> {
    let mut tx = state.store.begin().await?;
    let artifacts = tx.find_all_artifacts().await?;
    let wizards: HashMap<i32, Wizard> = tx
        .find_all_wizards()
        .await?
        .into_iter()
        .map(|w| (w.id, w))
        .collect();

    let dtos = artifacts
        .iter()
        .map(|a| ArtifactDto::new(a, a.owner_id.and_then(|id| wizards.get(&id))))
        .collect();
    Ok(ApiResult::success("Find All Success", dtos))
}

/// GET /artifacts/{artifact_id}
async fn find_artifact(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<ApiResult<ArtifactDto>, AppError> {
    let Path(artifact_id) = path?;
    let mut tx = state.store.begin().await?;
    let artifact = tx
        .find_artifact(&artifact_id)
        .await?
        .ok_or_else(|| AppError::not_found(ARTIFACT, &artifact_id))?;
    let owner = owner_of(tx.as_mut(), &artifact).await?;
    Ok(ApiResult::success(
        "Find One Success",
        ArtifactDto::new(&artifact, owner.as_ref()),
    ))
}

/// POST /artifacts - Create an unowned artifact with a fresh id.
async fn add_artifact(
    State(state): State<AppState>,
    body: Result<Json<ArtifactRequest>, JsonRejection>,
) -> Result<ApiResult<ArtifactDto>, AppError> {
    let Json(req) = body?;
    let valid = req.validate()?;

    let artifact = Artifact::new(
        state.ids.next_id_string()?,
        valid.name,
        valid.description,
        valid.image_url,
    );

    let mut tx = state.store.begin().await?;
    tx.save_artifact(&artifact).await?;
    tx.commit().await?;

    tracing::info!(artifact_id = %artifact.id, name = %artifact.name, "Artifact created");
    Ok(ApiResult::success("Add Success", ArtifactDto::new(&artifact, None)))
}

/// PUT /artifacts/{artifact_id} - Replace name, description and image URL.
/// Ownership is unaffected.
async fn update_artifact(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<ArtifactRequest>, JsonRejection>,
) -> Result<ApiResult<ArtifactDto>, AppError> {
    let Path(artifact_id) = path?;
    let Json(req) = body?;
    let valid = req.validate()?;

    let mut tx = state.store.begin().await?;
    let mut artifact = tx
        .find_artifact(&artifact_id)
        .await?
        .ok_or_else(|| AppError::not_found(ARTIFACT, &artifact_id))?;

    artifact.name = valid.name;
    artifact.description = valid.description;
    artifact.image_url = valid.image_url;
    tx.save_artifact(&artifact).await?;
    let owner = owner_of(tx.as_mut(), &artifact).await?;
    tx.commit().await?;

    tracing::info!(artifact_id = %artifact.id, "Artifact updated");
    Ok(ApiResult::success(
        "Update Success",
        ArtifactDto::new(&artifact, owner.as_ref()),
    ))
}

/// DELETE /artifacts/{artifact_id}
async fn delete_artifact(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> Result<ApiResult<()>, AppError> {
    let Path(artifact_id) = path?;
    state.registry.delete_artifact(&artifact_id).await?;
    Ok(ApiResult::message_only("Delete Success"))
}
