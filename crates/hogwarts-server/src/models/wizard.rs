//! Wizard model: the owning side of the wizard/artifact relationship.

use serde::{Deserialize, Serialize};

use super::artifact::Artifact;

/// A wizard and the ids of the artifacts it owns.
///
/// Relationships are id references only. `artifact_ids` has set semantics and
/// keeps insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wizard {
    /// Sequential id assigned by the store.
    pub id: i32,
    pub name: String,
    pub artifact_ids: Vec<String>,
}

impl Wizard {
    pub fn number_of_artifacts(&self) -> usize {
        self.artifact_ids.len()
    }

    pub fn owns(&self, artifact_id: &str) -> bool {
        self.artifact_ids.iter().any(|id| id == artifact_id)
    }

    /// Takes ownership of `artifact`: records membership (once) and points the
    /// artifact's owner reference here.
    pub fn add_artifact(&mut self, artifact: &mut Artifact) {
        artifact.owner_id = Some(self.id);
        if !self.owns(&artifact.id) {
            self.artifact_ids.push(artifact.id.clone());
        }
    }

    /// Releases `artifact`. Removing an artifact this wizard does not own is
    /// a no-op; the owner reference is only cleared if it points here.
    pub fn remove_artifact(&mut self, artifact: &mut Artifact) {
        if artifact.owner_id == Some(self.id) {
            artifact.owner_id = None;
        }
        self.artifact_ids.retain(|id| id != &artifact.id);
    }

    /// Empties the collection and returns the ids that were in it. Callers
    /// must clear the owner reference on each returned artifact.
    pub fn take_artifact_ids(&mut self) -> Vec<String> {
        std::mem::take(&mut self.artifact_ids)
    }
}

/// Wizard as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardDto {
    pub id: i32,
    pub name: String,
    pub number_of_artifacts: usize,
}

impl From<&Wizard> for WizardDto {
    fn from(wizard: &Wizard) -> Self {
        Self {
            id: wizard.id,
            name: wizard.name.clone(),
            number_of_artifacts: wizard.number_of_artifacts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wizard(id: i32) -> Wizard {
        Wizard {
            id,
            name: format!("wizard-{}", id),
            artifact_ids: Vec::new(),
        }
    }

    fn artifact(id: &str) -> Artifact {
        Artifact::new(
            id.to_string(),
            "name".to_string(),
            "description".to_string(),
            "image".to_string(),
        )
    }

    #[test]
    fn test_add_artifact_sets_both_sides() {
        let mut w = wizard(7);
        let mut a = artifact("A1");

        w.add_artifact(&mut a);

        assert_eq!(a.owner_id, Some(7));
        assert_eq!(w.artifact_ids, vec!["A1".to_string()]);
    }

    #[test]
    fn test_add_artifact_twice_keeps_single_membership() {
        let mut w = wizard(7);
        let mut a = artifact("A1");

        w.add_artifact(&mut a);
        w.add_artifact(&mut a);

        assert_eq!(w.number_of_artifacts(), 1);
    }

    #[test]
    fn test_remove_artifact_clears_both_sides() {
        let mut w = wizard(7);
        let mut a = artifact("A1");
        w.add_artifact(&mut a);

        w.remove_artifact(&mut a);

        assert_eq!(a.owner_id, None);
        assert!(w.artifact_ids.is_empty());
    }

    #[test]
    fn test_remove_unowned_artifact_is_noop() {
        let mut w7 = wizard(7);
        let mut w9 = wizard(9);
        let mut a = artifact("A1");
        w9.add_artifact(&mut a);

        w7.remove_artifact(&mut a);

        assert_eq!(a.owner_id, Some(9), "other owner's reference must survive");
        assert!(w9.owns("A1"));
    }

    #[test]
    fn test_take_artifact_ids_empties_collection() {
        let mut w = wizard(7);
        let mut a1 = artifact("A1");
        let mut a2 = artifact("A2");
        w.add_artifact(&mut a1);
        w.add_artifact(&mut a2);

        let taken = w.take_artifact_ids();

        assert_eq!(taken, vec!["A1".to_string(), "A2".to_string()]);
        assert_eq!(w.number_of_artifacts(), 0);
    }
}
