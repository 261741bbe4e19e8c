//! Wizard/artifact ownership.
//!
//! Every relationship change goes through [`OwnershipRegistry`] so that the
//! wizard's collection and the artifact's owner reference always agree. Each
//! operation runs in one store transaction: either every write lands or none
//! does.

use std::sync::Arc;

use crate::error::AppError;
use crate::models::{Artifact, Wizard};
use crate::store::{Store, StoreTx};

pub const ARTIFACT: &str = "artifact";
pub const WIZARD: &str = "wizard";

#[derive(Clone)]
pub struct OwnershipRegistry {
    store: Arc<dyn Store>,
}

impl OwnershipRegistry {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Makes `wizard_id` the sole owner of `artifact_id`, detaching it from
    /// any previous owner.
    ///
    /// The artifact is looked up before the wizard, so when both are missing
    /// the error names the artifact.
    pub async fn assign(&self, wizard_id: i32, artifact_id: &str) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;

        let mut artifact = find_artifact(tx.as_mut(), artifact_id).await?;
        let mut wizard = find_wizard(tx.as_mut(), wizard_id).await?;

        match artifact.owner_id {
            Some(owner_id) if owner_id == wizard.id => {
                wizard.remove_artifact(&mut artifact);
            }
            Some(owner_id) => match tx.find_wizard(owner_id).await? {
                Some(mut previous) => {
                    previous.remove_artifact(&mut artifact);
                    tx.save_wizard(&previous).await?;
                }
                None => {
                    tracing::warn!(
                        artifact_id = %artifact.id,
                        owner_id,
                        "Artifact references a missing owner; detaching"
                    );
                    artifact.owner_id = None;
                }
            },
            None => {}
        }

        wizard.add_artifact(&mut artifact);
        tx.save_artifact(&artifact).await?;
        tx.save_wizard(&wizard).await?;
        tx.commit().await?;

        tracing::info!(wizard_id, artifact_id, "Artifact assigned");
        Ok(())
    }

    /// Releases every artifact owned by `wizard_id`. The artifacts stay
    /// stored, unowned.
    pub async fn unassign_all(&self, wizard_id: i32) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        let mut wizard = find_wizard(tx.as_mut(), wizard_id).await?;
        let released = release_all(tx.as_mut(), &mut wizard).await?;
        tx.commit().await?;

        tracing::info!(wizard_id, released, "Wizard artifacts unassigned");
        Ok(())
    }

    /// Deletes an artifact, detaching it from its owner first.
    pub async fn delete_artifact(&self, artifact_id: &str) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        let mut artifact = find_artifact(tx.as_mut(), artifact_id).await?;

        if let Some(owner_id) = artifact.owner_id {
            if let Some(mut owner) = tx.find_wizard(owner_id).await? {
                owner.remove_artifact(&mut artifact);
                tx.save_wizard(&owner).await?;
            }
        }

        tx.delete_artifact(artifact_id).await?;
        tx.commit().await?;

        tracing::info!(artifact_id, "Artifact deleted");
        Ok(())
    }

    /// Unassigns everything the wizard owns, then deletes the wizard.
    pub async fn delete_wizard(&self, wizard_id: i32) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;
        let mut wizard = find_wizard(tx.as_mut(), wizard_id).await?;
        let released = release_all(tx.as_mut(), &mut wizard).await?;
        tx.delete_wizard(wizard_id).await?;
        tx.commit().await?;

        tracing::info!(wizard_id, released, "Wizard deleted");
        Ok(())
    }
}

async fn find_artifact(tx: &mut dyn StoreTx, id: &str) -> Result<Artifact, AppError> {
    tx.find_artifact(id)
        .await?
        .ok_or_else(|| AppError::not_found(ARTIFACT, id))
}

async fn find_wizard(tx: &mut dyn StoreTx, id: i32) -> Result<Wizard, AppError> {
    tx.find_wizard(id)
        .await?
        .ok_or_else(|| AppError::not_found(WIZARD, id))
}

/// Clears the wizard's collection and every released artifact's owner
/// reference. Returns how many artifacts were released.
async fn release_all(tx: &mut dyn StoreTx, wizard: &mut Wizard) -> Result<usize, AppError> {
    let ids = wizard.take_artifact_ids();
    for id in &ids {
        if let Some(mut artifact) = tx.find_artifact(id).await? {
            if artifact.owner_id == Some(wizard.id) {
                artifact.owner_id = None;
                tx.save_artifact(&artifact).await?;
            }
        }
    }
    tx.save_wizard(wizard).await?;
    Ok(ids.len())
}
