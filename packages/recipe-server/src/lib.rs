//! HTTP transport for the recipe extraction pipeline.

pub mod config;
pub mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use recipe_extraction::RecipeParser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub parser: Arc<RecipeParser>,
}

/// Build the Axum application router
pub fn build_app(parser: Arc<RecipeParser>) -> Router {
    Router::new()
        .route("/api/recipes/parse", post(routes::parse_handler))
        .route("/health", get(routes::health_handler))
        .with_state(AppState { parser })
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
