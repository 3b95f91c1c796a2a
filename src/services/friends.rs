use serde::Serialize;
use std::collections::HashSet;

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::UserSummary,
};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FriendsOverview {
    pub friends: Vec<UserSummary>,
    /// Every other user not befriended yet, by username
    pub potential_friends: Vec<UserSummary>,
}

pub async fn overview(repo: &dyn Repository, user_id: i64) -> AppResult<FriendsOverview> {
    let friends = repo.list_friends(user_id).await?;
    let friend_ids: HashSet<i64> = friends.iter().map(|f| f.id).collect();

    let potential_friends = repo
        .list_users()
        .await?
        .iter()
        .filter(|u| u.id != user_id && !friend_ids.contains(&u.id))
        .map(UserSummary::from)
        .collect();

    Ok(FriendsOverview {
        friends: friends.iter().map(UserSummary::from).collect(),
        potential_friends,
    })
}

async fn ensure_user(repo: &dyn Repository, id: i64) -> AppResult<()> {
    repo.get_user(id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
}

/// Adds `friend_id` to the caller's friends; befriending oneself does nothing
pub async fn add_friend(repo: &dyn Repository, user_id: i64, friend_id: i64) -> AppResult<()> {
    ensure_user(repo, friend_id).await?;
    if friend_id == user_id {
        return Ok(());
    }
    repo.add_friend(user_id, friend_id).await?;
    tracing::info!(user_id, friend_id, "Added friend");
    Ok(())
}

pub async fn remove_friend(repo: &dyn Repository, user_id: i64, friend_id: i64) -> AppResult<()> {
    ensure_user(repo, friend_id).await?;
    repo.remove_friend(user_id, friend_id).await?;
    tracing::info!(user_id, friend_id, "Removed friend");
    Ok(())
}
