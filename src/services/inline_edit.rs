//! Single-field saves issued by the recipe edit page
//!
//! Every edit names one row by id, one field and its new value. Rows whose
//! content becomes empty are removed, and removing a step renumbers the
//! remaining steps so numbering stays gapless.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{
        user::non_empty, Ingredient, Instruction, NewIngredient, RecipeUpdate,
    },
    services::{extractor::parse_quantity, recipes::owned_recipe},
};

/// One field edit: `{"id": 3, "field": "name", "value": "flour"}`
#[derive(Debug, Clone, Deserialize)]
pub struct InlineUpdate {
    #[serde(deserialize_with = "flexible_id")]
    pub id: i64,
    pub field: String,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum InlineOutcome {
    Ok,
    Deleted {
        id: i64,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        renumber: bool,
    },
}

/// Accepts ids sent as numbers or as numeric strings
fn flexible_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| D::Error::custom(format!("invalid id: {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid id: {:?}", s))),
        other => Err(D::Error::custom(format!("invalid id: {}", other))),
    }
}

/// Text form of an edit value; null reads as empty
fn value_text(value: &Value) -> AppResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(AppError::InvalidInput(format!(
            "Unsupported value: {}",
            other
        ))),
    }
}

fn unknown_field(field: &str) -> AppError {
    AppError::InvalidInput(format!("Unknown field: {}", field))
}

/// Reports a missing parent recipe as the row itself missing; other
/// failures pass through
fn missing_row(e: AppError, not_found: impl FnOnce() -> AppError) -> AppError {
    match e {
        AppError::NotFound(_) => not_found(),
        other => other,
    }
}

async fn owned_ingredient(repo: &dyn Repository, user_id: i64, id: i64) -> AppResult<Ingredient> {
    let not_found = || AppError::NotFound(format!("Ingredient {} not found", id));
    let ingredient = repo.get_ingredient(id).await?.ok_or_else(not_found)?;
    owned_recipe(repo, user_id, ingredient.recipe_id)
        .await
        .map_err(|e| missing_row(e, not_found))?;
    Ok(ingredient)
}

async fn owned_instruction(
    repo: &dyn Repository,
    user_id: i64,
    id: i64,
) -> AppResult<Instruction> {
    let not_found = || AppError::NotFound(format!("Instruction {} not found", id));
    let instruction = repo.get_instruction(id).await?.ok_or_else(not_found)?;
    owned_recipe(repo, user_id, instruction.recipe_id)
        .await
        .map_err(|e| missing_row(e, not_found))?;
    Ok(instruction)
}

pub async fn update_recipe_field(
    repo: &dyn Repository,
    user_id: i64,
    edit: InlineUpdate,
) -> AppResult<InlineOutcome> {
    let mut recipe = owned_recipe(repo, user_id, edit.id).await?;
    let text = Some(value_text(&edit.value)?);

    let update = match edit.field.as_str() {
        "title" => RecipeUpdate {
            title: text,
            ..Default::default()
        },
        "description" => RecipeUpdate {
            description: text,
            ..Default::default()
        },
        "prep_time" => RecipeUpdate {
            prep_time: text,
            ..Default::default()
        },
        "cook_time" => RecipeUpdate {
            cook_time: text,
            ..Default::default()
        },
        "servings" => RecipeUpdate {
            servings: text,
            ..Default::default()
        },
        "thumbnail" => RecipeUpdate {
            thumbnail: text,
            ..Default::default()
        },
        "url" => RecipeUpdate {
            url: text,
            ..Default::default()
        },
        field => return Err(unknown_field(field)),
    };

    recipe.apply(update)?;
    repo.save_recipe(&recipe).await?;
    Ok(InlineOutcome::Ok)
}

pub async fn update_ingredient_field(
    repo: &dyn Repository,
    user_id: i64,
    edit: InlineUpdate,
) -> AppResult<InlineOutcome> {
    let mut ingredient = owned_ingredient(repo, user_id, edit.id).await?;

    match edit.field.as_str() {
        "name" => ingredient.name = value_text(&edit.value)?.trim().to_string(),
        "quantity" => {
            ingredient.quantity = match &edit.value {
                Value::Number(n) => n.as_f64(),
                value => {
                    let text = value_text(value)?;
                    if text.trim().is_empty() {
                        None
                    } else {
                        Some(parse_quantity(&text).ok_or_else(|| {
                            AppError::InvalidInput(format!("Invalid quantity: {}", text))
                        })?)
                    }
                }
            }
        }
        "unit" => ingredient.unit = non_empty(value_text(&edit.value)?),
        field => return Err(unknown_field(field)),
    }

    if ingredient.is_blank() {
        repo.delete_ingredient(ingredient.id).await?;
        tracing::debug!(user_id, ingredient_id = ingredient.id, "Removed blank ingredient");
        return Ok(InlineOutcome::Deleted {
            id: ingredient.id,
            renumber: false,
        });
    }

    repo.save_ingredient(&ingredient).await?;
    Ok(InlineOutcome::Ok)
}

pub async fn update_instruction_field(
    repo: &dyn Repository,
    user_id: i64,
    edit: InlineUpdate,
) -> AppResult<InlineOutcome> {
    let mut instruction = owned_instruction(repo, user_id, edit.id).await?;
    if edit.field != "description" {
        return Err(unknown_field(&edit.field));
    }

    let description = value_text(&edit.value)?;
    if description.trim().is_empty() {
        repo.delete_instruction(instruction.id).await?;
        renumber_steps(repo, instruction.recipe_id).await?;
        tracing::debug!(
            user_id,
            instruction_id = instruction.id,
            recipe_id = instruction.recipe_id,
            "Removed blank step"
        );
        return Ok(InlineOutcome::Deleted {
            id: instruction.id,
            renumber: true,
        });
    }

    instruction.description = description;
    repo.save_instruction(&instruction).await?;
    Ok(InlineOutcome::Ok)
}

/// Renumbers a recipe's steps 1..n keeping their order
async fn renumber_steps(repo: &dyn Repository, recipe_id: i64) -> AppResult<()> {
    let steps = repo.list_instructions(recipe_id).await?;
    for (position, mut step) in (1..).zip(steps) {
        if step.step_number != position {
            step.step_number = position;
            repo.save_instruction(&step).await?;
        }
    }
    Ok(())
}

/// Appends an empty ingredient row to a recipe
pub async fn add_ingredient(
    repo: &dyn Repository,
    user_id: i64,
    recipe_id: i64,
) -> AppResult<Ingredient> {
    let recipe = owned_recipe(repo, user_id, recipe_id).await?;
    repo.insert_ingredient(recipe.id, &NewIngredient::default())
        .await
}

/// Appends an empty step, reusing a trailing empty one
pub async fn add_instruction(
    repo: &dyn Repository,
    user_id: i64,
    recipe_id: i64,
) -> AppResult<Instruction> {
    let recipe = owned_recipe(repo, user_id, recipe_id).await?;
    let steps = repo.list_instructions(recipe.id).await?;

    if let Some(last) = steps.last() {
        if last.description.trim().is_empty() {
            return Ok(last.clone());
        }
    }

    let step_number = steps.len() as i32 + 1;
    repo.insert_instruction(recipe.id, step_number, "").await
}
