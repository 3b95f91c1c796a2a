use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::Recipe;
use crate::error::{AppError, AppResult};

/// A named group of recipes
///
/// Shared collections are readable by the owner's friends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Collection {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: String,
    pub shared: bool,
    pub created_at: DateTime<Utc>,
}

impl Collection {
    pub fn apply(&mut self, update: CollectionUpdate) -> AppResult<()> {
        if let Some(name) = update.name {
            self.name = validate_name(&name)?;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(shared) = update.shared {
            self.shared = shared;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCollection {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub shared: bool,
}

impl NewCollection {
    /// Trims the name and rejects blank ones
    pub fn validated(mut self) -> AppResult<Self> {
        self.name = validate_name(&self.name)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub shared: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionDetail {
    #[serde(flatten)]
    pub collection: Collection,
    pub recipes: Vec<Recipe>,
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput(
            "Collection name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}
