//! Shared application state handed to every handler.

use std::sync::Arc;

use hogwarts_auth::{PasswordHasher, TokenAuthority};

use crate::access::{default_rules, AccessRule};
use crate::error::AppError;
use crate::id_worker::IdWorker;
use crate::registry::OwnershipRegistry;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub registry: OwnershipRegistry,
    pub tokens: Arc<TokenAuthority>,
    pub passwords: PasswordHasher,
    pub ids: Arc<IdWorker>,
    pub token_ttl: chrono::Duration,
    pub base_url: String,
    pub access_rules: Arc<Vec<AccessRule>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: TokenAuthority,
        passwords: PasswordHasher,
        ids: IdWorker,
        token_ttl: chrono::Duration,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            registry: OwnershipRegistry::new(store.clone()),
            store,
            tokens: Arc::new(tokens),
            passwords,
            ids: Arc::new(ids),
            token_ttl,
            base_url: base_url.into(),
            access_rules: Arc::new(default_rules()),
        }
    }

    /// Hashes a password on the blocking thread pool.
    pub async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.passwords;
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(AppError::from)
    }

    pub async fn verify_password(&self, password: String, hash: String) -> Result<bool, AppError> {
        let hasher = self.passwords;
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
            .map_err(AppError::from)
    }
}
