use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::{AuthUser, RequestId},
    models::UserSummary,
    routes::AppState,
    services::accounts::{self, LoginRequest, LoginResponse, SignupRequest},
};

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Json<SignupRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<UserSummary>)> {
    let Json(request) = body?;
    tracing::info!(request_id = %request_id, "Processing signup");
    let user = accounts::signup(state.repo.as_ref(), request, state.bcrypt_cost).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<LoginResponse>> {
    let Json(request) = body?;
    let response = accounts::login(state.repo.as_ref(), request).await?;
    Ok(Json(response))
}

pub async fn logout(State(state): State<Arc<AppState>>, auth: AuthUser) -> AppResult<StatusCode> {
    accounts::logout(state.repo.as_ref(), &auth.token).await?;
    tracing::info!(user_id = auth.id(), "User logged out");
    Ok(StatusCode::NO_CONTENT)
}
