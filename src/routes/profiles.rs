use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{ProfileUpdate, UserProfile},
    routes::AppState,
    services::profiles::{self, ProfileView},
};

pub async fn own(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(
        profiles::view_profile(state.repo.as_ref(), auth.id(), None).await?,
    ))
}

pub async fn view(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(
        profiles::view_profile(state.repo.as_ref(), auth.id(), Some(user_id)).await?,
    ))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> AppResult<Json<UserProfile>> {
    let Json(update) = body?;
    Ok(Json(
        profiles::update_profile(state.repo.as_ref(), auth.id(), update).await?,
    ))
}
