use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt::Display;

use super::user::non_empty;
use crate::error::{AppError, AppResult};

/// A stored recipe owned by one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub servings: Option<String>,
    /// Thumbnail image URL of the source video
    pub thumbnail: Option<String>,
    /// Link of the source video
    pub url: Option<String>,
}

impl Recipe {
    /// Applies a partial update
    ///
    /// `None` leaves a field untouched. Optional fields are cleared by an
    /// empty string; the title can never become blank.
    pub fn apply(&mut self, update: RecipeUpdate) -> AppResult<()> {
        if let Some(title) = update.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(AppError::InvalidInput("Title cannot be empty".to_string()));
            }
            self.title = title.to_string();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(prep_time) = update.prep_time {
            self.prep_time = non_empty(prep_time);
        }
        if let Some(cook_time) = update.cook_time {
            self.cook_time = non_empty(cook_time);
        }
        if let Some(servings) = update.servings {
            self.servings = non_empty(servings);
        }
        if let Some(thumbnail) = update.thumbnail {
            self.thumbnail = non_empty(thumbnail);
        }
        if let Some(url) = update.url {
            self.url = non_empty(url);
        }
        Ok(())
    }
}

/// Partial update of a recipe's scalar fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub prep_time: Option<String>,
    pub cook_time: Option<String>,
    pub servings: Option<String>,
    pub thumbnail: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub recipe_id: i64,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

impl Ingredient {
    /// True when every field is empty, i.e. the row carries no information
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
            && self.quantity.is_none()
            && self.unit.as_deref().map_or(true, |u| u.trim().is_empty())
    }
}

impl Display for Ingredient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::with_capacity(3);
        if let Some(quantity) = self.quantity {
            parts.push(quantity.to_string());
        }
        if let Some(unit) = self.unit.as_deref().filter(|u| !u.is_empty()) {
            parts.push(unit.to_string());
        }
        parts.push(self.name.clone());
        write!(f, "{}", parts.join(" "))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct Instruction {
    pub id: i64,
    pub recipe_id: i64,
    /// 1-based position; steps of a recipe are numbered without gaps
    pub step_number: i32,
    pub description: String,
}

/// A recipe together with its ordered children
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<Instruction>,
}

/// Ingredient data before it has an id
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewIngredient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Recipe data before it has an id
///
/// Instructions are plain step texts, numbered 1..n in the order given.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewRecipe {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prep_time: Option<String>,
    #[serde(default)]
    pub cook_time: Option<String>,
    #[serde(default)]
    pub servings: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<NewIngredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
}
