//! API routes for the Hogwarts server.

pub mod artifacts;
pub mod users;
pub mod wizards;

use axum::{middleware, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::access;
use crate::state::AppState;

/// Creates the main API router with all routes mounted under the configured
/// base URL and guarded by the access rules.
pub fn create_router(state: AppState) -> Router {
    let api = api_routes();
    let router = if state.base_url.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&state.base_url, api)
    };

    router
        .layer(middleware::from_fn_with_state(state.clone(), access::guard))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/artifacts", artifacts::router())
        .nest("/wizards", wizards::router())
        .nest("/users", users::router())
}
