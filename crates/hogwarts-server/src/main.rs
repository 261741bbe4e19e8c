//! Hogwarts server entry point.
//!
//! Reads configuration from the environment, selects a store, seeds the
//! administrator if requested, and serves the API until Ctrl-C.

use std::sync::Arc;

use anyhow::Context;
use hogwarts_auth::{PasswordHasher, TokenAuthority};
use hogwarts_server::config::Config;
use hogwarts_server::id_worker::IdWorker;
use hogwarts_server::store::{InMemoryStore, PostgresStore, Store};
use hogwarts_server::{bootstrap, create_router, db, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("invalid configuration")?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url, config.db_max_connections)
                .await
                .context("failed to connect to database")?;
            db::run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            Arc::new(PostgresStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store, data will not persist");
            Arc::new(InMemoryStore::new())
        }
    };

    let ids = IdWorker::new(config.worker_id, config.datacenter_id)
        .context("invalid id generator node")?;
    let tokens = TokenAuthority::generate().context("failed to create signing key")?;
    tracing::warn!("Signing key is ephemeral; tokens issued before a restart will be rejected");

    let state = AppState::new(
        store,
        tokens,
        PasswordHasher::default(),
        ids,
        config.token_ttl,
        config.base_url.clone(),
    );

    if let Some(admin) = &config.admin {
        bootstrap::seed_admin(&state, &admin.username, &admin.password)
            .await
            .context("failed to seed administrator")?;
    }

    let backend = state.store.backend_name();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(
        addr = %config.bind_addr,
        base_url = %config.base_url,
        backend,
        "Hogwarts server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .context("server error")?;

    Ok(())
}
