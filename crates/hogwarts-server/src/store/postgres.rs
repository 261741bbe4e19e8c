//! PostgreSQL store.
//!
//! Ownership lives in the `artifacts.owner_id` column; a wizard's collection
//! is read from it, and saving a wizard rewrites it to match the collection.
//! Single-row lookups take `FOR UPDATE` locks so concurrent transactions that
//! touch the same artifact or wizard serialize on the database.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::{Store, StoreError, StoreResult, StoreTx};
use crate::models::{Artifact, NewUser, User, Wizard};

/// Postgres error code for unique_violation.
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTx { tx }))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

/// Maps unique violations to [`StoreError::Conflict`].
fn map_unique_violation(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return StoreError::Conflict(message());
        }
    }
    StoreError::Database(err)
}

impl PostgresTx {
    async fn owned_artifact_ids(&mut self, wizard_id: i32) -> StoreResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM artifacts WHERE owner_id = $1 ORDER BY id")
                .bind(wizard_id)
                .fetch_all(&mut *self.tx)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn find_artifact(&mut self, id: &str) -> StoreResult<Option<Artifact>> {
        let artifact = sqlx::query_as::<_, Artifact>(
            r#"
            SELECT id, name, description, image_url, owner_id
            FROM artifacts
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(artifact)
    }

    async fn find_all_artifacts(&mut self) -> StoreResult<Vec<Artifact>> {
        let artifacts = sqlx::query_as::<_, Artifact>(
            "SELECT id, name, description, image_url, owner_id FROM artifacts ORDER BY id",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(artifacts)
    }

    async fn save_artifact(&mut self, artifact: &Artifact) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO artifacts (id, name, description, image_url, owner_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                image_url = EXCLUDED.image_url,
                owner_id = EXCLUDED.owner_id
            "#,
        )
        .bind(&artifact.id)
        .bind(&artifact.name)
        .bind(&artifact.description)
        .bind(&artifact.image_url)
        .bind(artifact.owner_id)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn delete_artifact(&mut self, id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM artifacts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_wizard(&mut self, id: i32) -> StoreResult<Option<Wizard>> {
        let row: Option<(i32, String)> =
            sqlx::query_as("SELECT id, name FROM wizards WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;

        let Some((id, name)) = row else {
            return Ok(None);
        };
        let artifact_ids = self.owned_artifact_ids(id).await?;
        Ok(Some(Wizard {
            id,
            name,
            artifact_ids,
        }))
    }

    async fn find_all_wizards(&mut self) -> StoreResult<Vec<Wizard>> {
        let rows: Vec<(i32, String)> = sqlx::query_as("SELECT id, name FROM wizards ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await?;

        let owned: Vec<(String, i32)> = sqlx::query_as(
            "SELECT id, owner_id FROM artifacts WHERE owner_id IS NOT NULL ORDER BY id",
        )
        .fetch_all(&mut *self.tx)
        .await?;

        let mut by_owner: HashMap<i32, Vec<String>> = HashMap::new();
        for (artifact_id, owner_id) in owned {
            by_owner.entry(owner_id).or_default().push(artifact_id);
        }

        Ok(rows
            .into_iter()
            .map(|(id, name)| Wizard {
                id,
                name,
                artifact_ids: by_owner.remove(&id).unwrap_or_default(),
            })
            .collect())
    }

    async fn insert_wizard(&mut self, name: &str) -> StoreResult<Wizard> {
        let (id, name): (i32, String) =
            sqlx::query_as("INSERT INTO wizards (name) VALUES ($1) RETURNING id, name")
                .bind(name)
                .fetch_one(&mut *self.tx)
                .await?;
        Ok(Wizard {
            id,
            name,
            artifact_ids: Vec::new(),
        })
    }

    async fn save_wizard(&mut self, wizard: &Wizard) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wizards (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name
            "#,
        )
        .bind(wizard.id)
        .bind(&wizard.name)
        .execute(&mut *self.tx)
        .await?;

        // Release artifacts no longer in the collection, then claim the rest.
        sqlx::query("UPDATE artifacts SET owner_id = NULL WHERE owner_id = $1 AND NOT (id = ANY($2))")
            .bind(wizard.id)
            .bind(&wizard.artifact_ids)
            .execute(&mut *self.tx)
            .await?;

        sqlx::query("UPDATE artifacts SET owner_id = $1 WHERE id = ANY($2)")
            .bind(wizard.id)
            .bind(&wizard.artifact_ids)
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete_wizard(&mut self, id: i32) -> StoreResult<()> {
        sqlx::query("DELETE FROM wizards WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn find_user(&mut self, id: i32) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, enabled, roles FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, enabled, roles FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn find_all_users(&mut self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT id, username, password, enabled, roles FROM users ORDER BY id",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(users)
    }

    async fn insert_user(&mut self, user: &NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password, enabled, roles)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password, enabled, roles
            "#,
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.enabled)
        .bind(&user.roles)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                format!("username '{}' is already taken", user.username)
            })
        })
    }

    async fn save_user(&mut self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password, enabled, roles)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username,
                password = EXCLUDED.password,
                enabled = EXCLUDED.enabled,
                roles = EXCLUDED.roles
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.enabled)
        .bind(&user.roles)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                format!("username '{}' is already taken", user.username)
            })
        })?;
        Ok(())
    }

    async fn delete_user(&mut self, id: i32) -> StoreResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
