//! Domain models for Hogwarts Artifacts Online.

pub mod artifact;
pub mod user;
pub mod wizard;

pub use artifact::{Artifact, ArtifactDto};
pub use user::{NewUser, User, UserDto};
pub use wizard::{Wizard, WizardDto};
