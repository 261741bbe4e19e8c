//! Hogwarts Artifacts Online server
//!
//! REST API for cataloguing magical artifacts and the wizards who own them,
//! with token-based access control over user management.

pub mod access;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod id_worker;
pub mod models;
pub mod registry;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;

pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
