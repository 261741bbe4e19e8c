//! Artifact model and its wire projection.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::wizard::{Wizard, WizardDto};

/// An item that may be owned by at most one wizard.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Artifact {
    /// Decimal id from the snowflake generator.
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    /// Back-reference to the owning wizard. The wizard's collection is the
    /// authority on membership; this mirrors it.
    pub owner_id: Option<i32>,
}

impl Artifact {
    /// Creates an unowned artifact.
    pub fn new(id: String, name: String, description: String, image_url: String) -> Self {
        Self {
            id,
            name,
            description,
            image_url,
            owner_id: None,
        }
    }

    pub fn is_owned(&self) -> bool {
        self.owner_id.is_some()
    }
}

/// Artifact as returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub owner: Option<WizardDto>,
}

impl ArtifactDto {
    /// Builds the projection. `owner` should be the wizard referenced by
    /// `artifact.owner_id`, if any.
    pub fn new(artifact: &Artifact, owner: Option<&Wizard>) -> Self {
        Self {
            id: artifact.id.clone(),
            name: artifact.name.clone(),
            description: artifact.description.clone(),
            image_url: artifact.image_url.clone(),
            owner: owner.map(WizardDto::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_artifact_is_unowned() {
        let artifact = Artifact::new(
            "1250808601744904191".to_string(),
            "Deluminator".to_string(),
            "A Deluminator is a device invented by Albus Dumbledore".to_string(),
            "ImageUrl".to_string(),
        );
        assert!(!artifact.is_owned());
    }

    #[test]
    fn test_dto_serializes_camel_case_with_owner() {
        let mut artifact = Artifact::new(
            "1".to_string(),
            "Invisibility Cloak".to_string(),
            "An invisibility cloak is used to make the wearer invisible.".to_string(),
            "ImageUrl".to_string(),
        );
        let wizard = Wizard {
            id: 2,
            name: "Harry Potter".to_string(),
            artifact_ids: vec!["1".to_string()],
        };
        artifact.owner_id = Some(wizard.id);

        let json = serde_json::to_value(ArtifactDto::new(&artifact, Some(&wizard))).unwrap();
        assert_eq!(json["imageUrl"], "ImageUrl");
        assert_eq!(json["owner"]["id"], 2);
        assert_eq!(json["owner"]["name"], "Harry Potter");
        assert_eq!(json["owner"]["numberOfArtifacts"], 1);
    }

    #[test]
    fn test_dto_owner_is_null_when_unowned() {
        let artifact = Artifact::new(
            "1".to_string(),
            "n".to_string(),
            "d".to_string(),
            "i".to_string(),
        );
        let json = serde_json::to_value(ArtifactDto::new(&artifact, None)).unwrap();
        assert!(json["owner"].is_null());
    }
}
