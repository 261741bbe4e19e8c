//! Persistence layer.
//!
//! All access goes through a [`StoreTx`] obtained from [`Store::begin`].
//! Writes become visible only on [`StoreTx::commit`]; dropping a transaction
//! without committing discards them. Multi-entity updates (such as moving an
//! artifact between wizards) therefore apply atomically or not at all.

use async_trait::async_trait;

use crate::models::{Artifact, NewUser, User, Wizard};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    fn backend_name(&self) -> &'static str;
}

/// A unit of work against the store.
///
/// Lookups return `None` rather than an error when the entity is missing.
/// Deleting a missing entity succeeds silently.
#[async_trait]
pub trait StoreTx: Send {
    async fn find_artifact(&mut self, id: &str) -> StoreResult<Option<Artifact>>;
    async fn find_all_artifacts(&mut self) -> StoreResult<Vec<Artifact>>;
    /// Inserts or replaces the artifact, including its owner reference.
    async fn save_artifact(&mut self, artifact: &Artifact) -> StoreResult<()>;
    async fn delete_artifact(&mut self, id: &str) -> StoreResult<()>;

    async fn find_wizard(&mut self, id: i32) -> StoreResult<Option<Wizard>>;
    async fn find_all_wizards(&mut self) -> StoreResult<Vec<Wizard>>;
    /// Creates an empty wizard with a store-assigned id.
    async fn insert_wizard(&mut self, name: &str) -> StoreResult<Wizard>;
    /// Inserts or replaces the wizard, including its artifact collection.
    async fn save_wizard(&mut self, wizard: &Wizard) -> StoreResult<()>;
    async fn delete_wizard(&mut self, id: i32) -> StoreResult<()>;

    async fn find_user(&mut self, id: i32) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>>;
    async fn find_all_users(&mut self) -> StoreResult<Vec<User>>;
    /// Creates a user with a store-assigned id. Fails with
    /// [`StoreError::Conflict`] if the username is taken.
    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User>;
    async fn save_user(&mut self, user: &User) -> StoreResult<()>;
    async fn delete_user(&mut self, id: i32) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}
