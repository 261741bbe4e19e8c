//! First-run administrator seeding.

use crate::error::AppError;
use crate::models::NewUser;
use crate::state::AppState;

/// Roles given to the seeded administrator.
pub const ADMIN_ROLES: &str = "admin user";

/// Creates an enabled administrator unless a user with `username` exists.
/// Returns whether a user was created.
pub async fn seed_admin(state: &AppState, username: &str, password: &str) -> Result<bool, AppError> {
    {
        let mut tx = state.store.begin().await?;
        if tx.find_user_by_username(username).await?.is_some() {
            tracing::info!(%username, "Administrator already present; skipping seed");
            return Ok(false);
        }
    }

    let hash = state.hash_password(password.to_string()).await?;

    let mut tx = state.store.begin().await?;
    let user = tx
        .insert_user(&NewUser {
            username: username.to_string(),
            password: hash,
            enabled: true,
            roles: ADMIN_ROLES.to_string(),
        })
        .await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, %username, "Seeded administrator account");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hogwarts_auth::{PasswordHasher, TokenAuthority};

    use crate::id_worker::IdWorker;
    use crate::store::InMemoryStore;

    fn state() -> AppState {
        AppState::new(
            Arc::new(InMemoryStore::new()),
            TokenAuthority::generate().unwrap(),
            PasswordHasher::with_cost(4),
            IdWorker::new(1, 1).unwrap(),
            chrono::Duration::hours(2),
            "/api/v1",
        )
    }

    #[tokio::test]
    async fn test_seed_admin_once() {
        let state = state();

        assert!(seed_admin(&state, "admin", "secret").await.unwrap());
        assert!(!seed_admin(&state, "admin", "other").await.unwrap());

        let mut tx = state.store.begin().await.unwrap();
        let users = tx.find_all_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert!(users[0].enabled);
        assert_eq!(users[0].role_list(), vec!["admin", "user"]);
        assert_ne!(users[0].password, "secret");
        assert!(state
            .verify_password("secret".to_string(), users[0].password.clone())
            .await
            .unwrap());
    }
}
