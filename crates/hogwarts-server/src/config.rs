//! Server configuration loaded from environment variables.

use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};

use crate::id_worker::MAX_NODE_ID;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BASE_URL: &str = "/api/v1";
const DEFAULT_TOKEN_TTL_HOURS: i64 = 2;
const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;
const DEFAULT_NODE_ID: i64 = 1;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Prefix every route is mounted under. Empty means the root.
    pub base_url: String,
    /// In-memory store when unset.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub token_ttl: chrono::Duration,
    pub worker_id: i64,
    pub datacenter_id: i64,
    pub admin: Option<AdminCredentials>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("BIND_ADDR must be a socket address like 0.0.0.0:8080")?;

        let base_url = normalize_base_url(
            &get("API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        )?;

        let db_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };

        let ttl_hours = match get("TOKEN_TTL_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .context("TOKEN_TTL_HOURS must be an integer")?,
            None => DEFAULT_TOKEN_TTL_HOURS,
        };
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&ttl_hours) {
            return Err(anyhow!(
                "TOKEN_TTL_HOURS must be between 1 and {}, got {}",
                MAX_TOKEN_TTL_HOURS,
                ttl_hours
            ));
        }
        let token_ttl = chrono::Duration::try_hours(ttl_hours)
            .ok_or_else(|| anyhow!("TOKEN_TTL_HOURS out of range: {}", ttl_hours))?;

        let worker_id = node_id(get("ID_WORKER_ID"), "ID_WORKER_ID")?;
        let datacenter_id = node_id(get("ID_DATACENTER_ID"), "ID_DATACENTER_ID")?;

        let admin = match (get("HOGWARTS_ADMIN_USERNAME"), get("HOGWARTS_ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminCredentials { username, password }),
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "HOGWARTS_ADMIN_USERNAME and HOGWARTS_ADMIN_PASSWORD must be set together"
                ))
            }
        };

        Ok(Self {
            bind_addr,
            base_url,
            database_url: get("DATABASE_URL"),
            db_max_connections,
            token_ttl,
            worker_id,
            datacenter_id,
            admin,
        })
    }
}

fn node_id(raw: Option<String>, key: &str) -> Result<i64> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_NODE_ID);
    };
    let value = raw
        .parse::<i64>()
        .with_context(|| format!("{} must be an integer", key))?;
    if !(0..=MAX_NODE_ID).contains(&value) {
        return Err(anyhow!("{} must be between 0 and {}, got {}", key, MAX_NODE_ID, value));
    }
    Ok(value)
}

/// `/api/v1/` becomes `/api/v1`; `/` becomes the empty prefix.
fn normalize_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if !trimmed.starts_with('/') {
        return Err(anyhow!("API_BASE_URL must start with '/', got {:?}", raw));
    }
    Ok(trimmed.to_string())
}
