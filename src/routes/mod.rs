use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::Repository,
    middleware::{make_span_with_request_id, request_id_middleware},
    services::{CaptionSource, RecipeExtractor},
};

pub mod auth;
pub mod collections;
pub mod friends;
pub mod inline;
pub mod profiles;
pub mod recipes;

/// Shared handler state
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub captions: Arc<dyn CaptionSource>,
    pub extractor: Arc<dyn RecipeExtractor>,
    pub bcrypt_cost: u32,
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(request_id_middleware))
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/recipes", get(recipes::list).post(recipes::create))
        .route("/recipes/import", post(recipes::import))
        .route(
            "/recipes/:id",
            get(recipes::detail)
                .patch(recipes::update)
                .delete(recipes::delete),
        )
        .route("/recipes/:id/thumbnail", post(recipes::refresh_thumbnail))
        .route("/recipes/:id/ingredients", post(inline::add_ingredient))
        .route("/recipes/:id/instructions", post(inline::add_instruction))
        .route("/inline/recipe", post(inline::update_recipe))
        .route("/inline/ingredient", post(inline::update_ingredient))
        .route("/inline/instruction", post(inline::update_instruction))
        .route("/profile", get(profiles::own).put(profiles::update))
        .route("/profile/:user_id", get(profiles::view))
        .route("/friends", get(friends::overview))
        .route(
            "/friends/:user_id",
            post(friends::add).delete(friends::remove),
        )
        .route(
            "/collections",
            get(collections::list).post(collections::create),
        )
        .route(
            "/collections/:id",
            get(collections::detail)
                .patch(collections::update)
                .delete(collections::delete),
        )
        .route(
            "/collections/:id/recipes/:recipe_id",
            post(collections::add_recipe).delete(collections::remove_recipe),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
