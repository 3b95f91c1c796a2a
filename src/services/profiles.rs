use serde::Serialize;

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{ProfileUpdate, Recipe, UserProfile, UserSummary},
};

/// A user with their profile and recipes
#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub user: UserSummary,
    pub profile: UserProfile,
    pub recipes: Vec<Recipe>,
}

/// Shows the profile of `target`, or of the caller when absent
pub async fn view_profile(
    repo: &dyn Repository,
    user_id: i64,
    target: Option<i64>,
) -> AppResult<ProfileView> {
    let target = target.unwrap_or(user_id);
    let user = repo
        .get_user(target)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", target)))?;

    let profile = repo
        .get_profile(user.id)
        .await?
        .unwrap_or_else(|| UserProfile::empty(user.id));
    let recipes = repo.list_recipes(user.id).await?;

    Ok(ProfileView {
        user: UserSummary::from(&user),
        profile,
        recipes,
    })
}

pub async fn update_profile(
    repo: &dyn Repository,
    user_id: i64,
    update: ProfileUpdate,
) -> AppResult<UserProfile> {
    let mut profile = repo
        .get_profile(user_id)
        .await?
        .unwrap_or_else(|| UserProfile::empty(user_id));
    profile.apply(update);
    repo.save_profile(&profile).await?;

    tracing::info!(user_id, "Updated profile");
    Ok(profile)
}
