//! In-memory store.
//!
//! Keeps every entity in ordered maps behind a single `tokio::sync::Mutex`.
//! A transaction holds the lock for its whole lifetime and works on a copy of
//! the state; commit swaps the copy in. Transactions are therefore fully
//! serialized and an abandoned one leaves no trace.
//!
//! Not durable: state is lost on restart. Intended for local development and
//! tests. Copying the state per transaction is linear in its size.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreError, StoreResult, StoreTx};
use crate::models::{Artifact, NewUser, User, Wizard};

#[derive(Debug, Clone)]
struct MemoryState {
    artifacts: BTreeMap<String, Artifact>,
    wizards: BTreeMap<i32, Wizard>,
    users: BTreeMap<i32, User>,
    next_wizard_id: i32,
    next_user_id: i32,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            artifacts: BTreeMap::new(),
            wizards: BTreeMap::new(),
            users: BTreeMap::new(),
            next_wizard_id: 1,
            next_user_id: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTx { guard, working }))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl InMemoryTx {
    fn username_taken(&self, username: &str, except_id: Option<i32>) -> bool {
        self.working
            .users
            .values()
            .any(|u| u.username == username && Some(u.id) != except_id)
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn find_artifact(&mut self, id: &str) -> StoreResult<Option<Artifact>> {
        Ok(self.working.artifacts.get(id).cloned())
    }

    async fn find_all_artifacts(&mut self) -> StoreResult<Vec<Artifact>> {
        Ok(self.working.artifacts.values().cloned().collect())
    }

    async fn save_artifact(&mut self, artifact: &Artifact) -> StoreResult<()> {
        self.working
            .artifacts
            .insert(artifact.id.clone(), artifact.clone());
        Ok(())
    }

    async fn delete_artifact(&mut self, id: &str) -> StoreResult<()> {
        self.working.artifacts.remove(id);
        Ok(())
    }

    async fn find_wizard(&mut self, id: i32) -> StoreResult<Option<Wizard>> {
        Ok(self.working.wizards.get(&id).cloned())
    }

    async fn find_all_wizards(&mut self) -> StoreResult<Vec<Wizard>> {
        Ok(self.working.wizards.values().cloned().collect())
    }

    async fn insert_wizard(&mut self, name: &str) -> StoreResult<Wizard> {
        let id = self.working.next_wizard_id;
        self.working.next_wizard_id += 1;
        let wizard = Wizard {
            id,
            name: name.to_string(),
            artifact_ids: Vec::new(),
        };
        self.working.wizards.insert(id, wizard.clone());
        Ok(wizard)
    }

    async fn save_wizard(&mut self, wizard: &Wizard) -> StoreResult<()> {
        if wizard.id >= self.working.next_wizard_id {
            self.working.next_wizard_id = wizard.id + 1;
        }
        self.working.wizards.insert(wizard.id, wizard.clone());
        Ok(())
    }

    async fn delete_wizard(&mut self, id: i32) -> StoreResult<()> {
        self.working.wizards.remove(&id);
        Ok(())
    }

    async fn find_user(&mut self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_all_users(&mut self) -> StoreResult<Vec<User>> {
        Ok(self.working.users.values().cloned().collect())
    }

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        if self.username_taken(&user.username, None) {
            return Err(StoreError::Conflict(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        let id = self.working.next_user_id;
        self.working.next_user_id += 1;
        let stored = User {
            id,
            username: user.username.clone(),
            password: user.password.clone(),
            enabled: user.enabled,
            roles: user.roles.clone(),
        };
        self.working.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        if self.username_taken(&user.username, Some(user.id)) {
            return Err(StoreError::Conflict(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        if user.id >= self.working.next_user_id {
            self.working.next_user_id = user.id + 1;
        }
        self.working.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn delete_user(&mut self, id: i32) -> StoreResult<()> {
        self.working.users.remove(&id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let InMemoryTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}
