use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::AuthUser,
    routes::AppState,
    services::friends::{self, FriendsOverview},
};

pub async fn overview(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> AppResult<Json<FriendsOverview>> {
    Ok(Json(friends::overview(state.repo.as_ref(), auth.id()).await?))
}

pub async fn add(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(friend_id): Path<i64>,
) -> AppResult<StatusCode> {
    friends::add_friend(state.repo.as_ref(), auth.id(), friend_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(friend_id): Path<i64>,
) -> AppResult<StatusCode> {
    friends::remove_friend(state.repo.as_ref(), auth.id(), friend_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
