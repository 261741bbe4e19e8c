//! Wizard routes, including artifact assignment.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::error::AppError;
use crate::models::WizardDto;
use crate::registry::WIZARD;
use crate::response::ApiResult;
use crate::state::AppState;
use crate::validation::Validator;

/// Creates the wizards router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(find_all_wizards).post(add_wizard))
        .route(
            "/{wizard_id}",
            get(find_wizard).put(update_wizard).delete(delete_wizard),
        )
        .route("/{wizard_id}/artifacts/{artifact_id}", put(assign_artifact))
}

#[derive(Debug, Deserialize)]
pub struct WizardRequest {
    pub name: Option<String>,
}

impl WizardRequest {
    fn validate(self) -> Result<String, AppError> {
        let mut v = Validator::new();
        let name = v.required("name", self.name);
        v.finish()?;
        Ok(name)
    }
}

/// GET /wizards
async fn find_all_wizards(
    State(state): State<AppState>,
) -> Result<ApiResult<Vec<WizardDto>>, AppError> {
    let mut tx = state.store.begin().await?;
    let wizards = tx.find_all_wizards().await?;
    Ok(ApiResult::success(
        "Find All Success",
        wizards.iter().map(WizardDto::from).collect(),
    ))
}

/// GET /wizards/{wizard_id}
async fn find_wizard(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<ApiResult<WizardDto>, AppError> {
    let Path(wizard_id) = path?;
    let mut tx = state.store.begin().await?;
    let wizard = tx
        .find_wizard(wizard_id)
        .await?
        .ok_or_else(|| AppError::not_found(WIZARD, wizard_id))?;
    Ok(ApiResult::success("Find One Success", WizardDto::from(&wizard)))
}

/// POST /wizards - Create a wizard with an empty collection.
async fn add_wizard(
    State(state): State<AppState>,
    body: Result<Json<WizardRequest>, JsonRejection>,
) -> Result<ApiResult<WizardDto>, AppError> {
    let Json(req) = body?;
    let name = req.validate()?;

    let mut tx = state.store.begin().await?;
    let wizard = tx.insert_wizard(&name).await?;
    tx.commit().await?;

    tracing::info!(wizard_id = wizard.id, name = %wizard.name, "Wizard created");
    Ok(ApiResult::success("Add Success", WizardDto::from(&wizard)))
}

/// PUT /wizards/{wizard_id} - Rename a wizard.
async fn update_wizard(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<WizardRequest>, JsonRejection>,
) -> Result<ApiResult<WizardDto>, AppError> {
    let Path(wizard_id) = path?;
    let Json(req) = body?;
    let name = req.validate()?;

    let mut tx = state.store.begin().await?;
    let mut wizard = tx
        .find_wizard(wizard_id)
        .await?
        .ok_or_else(|| AppError::not_found(WIZARD, wizard_id))?;
    wizard.name = name;
    tx.save_wizard(&wizard).await?;
    tx.commit().await?;

    tracing::info!(wizard_id, "Wizard updated");
    Ok(ApiResult::success("Update Success", WizardDto::from(&wizard)))
}

/// DELETE /wizards/{wizard_id} - Unassigns the wizard's artifacts first.
async fn delete_wizard(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<ApiResult<()>, AppError> {
    let Path(wizard_id) = path?;
    state.registry.delete_wizard(wizard_id).await?;
    Ok(ApiResult::message_only("Delete Success"))
}

/// PUT /wizards/{wizard_id}/artifacts/{artifact_id}
async fn assign_artifact(
    State(state): State<AppState>,
    path: Result<Path<(i32, String)>, PathRejection>,
) -> Result<ApiResult<()>, AppError> {
    let Path((wizard_id, artifact_id)) = path?;
    state.registry.assign(wizard_id, &artifact_id).await?;
    Ok(ApiResult::message_only("Artifact Assignment Success"))
}
