use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::AppError,
    middleware::AuthUser,
    routes::AppState,
    services::inline_edit::{self, InlineOutcome, InlineUpdate},
};

/// Error in the edit page's `{"status":"error","message":...}` shape
#[derive(Debug)]
pub struct InlineError(AppError);

impl From<AppError> for InlineError {
    fn from(error: AppError) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for InlineError {
    fn from(rejection: JsonRejection) -> Self {
        Self(rejection.into())
    }
}

impl IntoResponse for InlineError {
    fn into_response(self) -> Response {
        let status = self.0.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Inline edit failed");
        }
        (
            status,
            Json(json!({ "status": "error", "message": self.0.message() })),
        )
            .into_response()
    }
}

type InlineResult<T> = Result<Json<T>, InlineError>;

pub async fn update_recipe(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Result<Json<InlineUpdate>, JsonRejection>,
) -> InlineResult<InlineOutcome> {
    let Json(edit) = body?;
    let outcome = inline_edit::update_recipe_field(state.repo.as_ref(), auth.id(), edit).await?;
    Ok(Json(outcome))
}

pub async fn update_ingredient(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Result<Json<InlineUpdate>, JsonRejection>,
) -> InlineResult<InlineOutcome> {
    let Json(edit) = body?;
    let outcome =
        inline_edit::update_ingredient_field(state.repo.as_ref(), auth.id(), edit).await?;
    Ok(Json(outcome))
}

pub async fn update_instruction(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    body: Result<Json<InlineUpdate>, JsonRejection>,
) -> InlineResult<InlineOutcome> {
    let Json(edit) = body?;
    let outcome =
        inline_edit::update_instruction_field(state.repo.as_ref(), auth.id(), edit).await?;
    Ok(Json(outcome))
}

pub async fn add_ingredient(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(recipe_id): Path<i64>,
) -> InlineResult<Value> {
    let ingredient = inline_edit::add_ingredient(state.repo.as_ref(), auth.id(), recipe_id).await?;
    Ok(Json(json!({ "status": "ok", "id": ingredient.id })))
}

pub async fn add_instruction(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(recipe_id): Path<i64>,
) -> InlineResult<Value> {
    let instruction =
        inline_edit::add_instruction(state.repo.as_ref(), auth.id(), recipe_id).await?;
    Ok(Json(json!({
        "status": "ok",
        "id": instruction.id,
        "step_number": instruction.step_number
    })))
}
