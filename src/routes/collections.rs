use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{Collection, CollectionDetail, CollectionUpdate, NewCollection},
    routes::AppState,
    services::collections,
};

pub async fn list(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<Vec<Collection>>> {
    Ok(Json(
        collections::list_collections(state.repo.as_ref(), auth.id()).await?,
    ))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Result<Json<NewCollection>, JsonRejection>,
) -> AppResult<(StatusCode, Json<Collection>)> {
    let Json(collection) = body?;
    let created = collections::create_collection(state.repo.as_ref(), auth.id(), collection).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn detail(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<CollectionDetail>> {
    Ok(Json(
        collections::collection_detail(state.repo.as_ref(), auth.id(), id).await?,
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
    body: Result<Json<CollectionUpdate>, JsonRejection>,
) -> AppResult<Json<Collection>> {
    let Json(update) = body?;
    Ok(Json(
        collections::update_collection(state.repo.as_ref(), auth.id(), id, update).await?,
    ))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    collections::delete_collection(state.repo.as_ref(), auth.id(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_recipe(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((id, recipe_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    collections::add_recipe(state.repo.as_ref(), auth.id(), id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_recipe(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path((id, recipe_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    collections::remove_recipe(state.repo.as_ref(), auth.id(), id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
