use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::{AuthUser, RequestId},
    models::{NewRecipe, Recipe, RecipeDetail, RecipeUpdate},
    routes::AppState,
    services::{
        import,
        recipes::{self, RecipeListing},
    },
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    #[serde(default, alias = "tiktok_link")]
    link: String,
}

/// Lists the caller's recipes, or searches them when `q` is given
pub async fn list(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(params): Query<ListQuery>,
) -> AppResult<Json<RecipeListing>> {
    let listing = recipes::list_recipes(state.repo.as_ref(), auth.id(), params.q.as_deref()).await?;
    Ok(Json(listing))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Result<Json<NewRecipe>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RecipeDetail>)> {
    let Json(recipe) = body?;
    let detail = recipes::create_recipe(state.repo.as_ref(), auth.id(), recipe).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Handler for the video import endpoint
pub async fn import(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    auth: AuthUser,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<RecipeDetail>)> {
    let Json(request) = body?;
    tracing::info!(
        request_id = %request_id,
        user_id = auth.id(),
        link = %request.link,
        "Processing import request"
    );

    let detail = import::import_recipe(
        state.repo.as_ref(),
        state.captions.as_ref(),
        state.extractor.as_ref(),
        auth.id(),
        &request.link,
    )
    .await?;

    tracing::info!(
        request_id = %request_id,
        recipe_id = detail.recipe.id,
        "Import completed"
    );

    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<RecipeDetail>> {
    let detail = recipes::recipe_detail(state.repo.as_ref(), auth.id(), id).await?;
    Ok(Json(detail))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
    body: Result<Json<RecipeUpdate>, JsonRejection>,
) -> AppResult<Json<Recipe>> {
    let Json(update) = body?;
    let recipe = recipes::update_recipe(state.repo.as_ref(), auth.id(), id, update).await?;
    Ok(Json(recipe))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    recipes::delete_recipe(state.repo.as_ref(), auth.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn refresh_thumbnail(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    tracing::info!(request_id = %request_id, recipe_id = id, "Refreshing thumbnail");

    let thumbnail =
        recipes::refresh_thumbnail(state.repo.as_ref(), state.captions.as_ref(), auth.id(), id)
            .await?;
    Ok(Json(json!({ "status": "ok", "thumbnail_url": thumbnail })))
}
