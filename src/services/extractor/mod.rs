//! Structured recipe extraction from free text
//!
//! An extractor labels spans of a caption with classes; the one we care
//! about is `Recipe`, whose payload is the recipe as JSON. [`recipe_draft`]
//! turns the raw extractions into a [`RecipeDraft`] and is tolerant of the
//! loose typing language models produce (numbers as strings, JSON inside a
//! string, missing keys).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::models::{NewIngredient, NewRecipe};

pub mod gemini;

pub use gemini::GeminiExtractor;

/// Extraction class carrying the recipe payload
pub const RECIPE_CLASS: &str = "Recipe";

/// One labelled item produced by an extractor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub extraction_class: String,
    /// JSON payload; either a JSON value or a string holding JSON
    pub extraction_text: Value,
}

/// Structured extraction over caption text
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecipeExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> AppResult<Vec<Extraction>>;

    /// Extractor name for logging
    fn name(&self) -> &'static str;
}

/// Recipe as described by an extractor, before it is stored
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecipeDraft {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub prep_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub cook_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub servings: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub ingredients: Vec<DraftIngredient>,
    #[serde(default, deserialize_with = "lenient_steps")]
    pub instructions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DraftIngredient {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_quantity")]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub unit: Option<String>,
}

impl RecipeDraft {
    /// Converts the draft into an insertable recipe for a source video
    ///
    /// Blank titles fall back to a placeholder, ingredients without any
    /// content and blank steps are dropped.
    pub fn into_new_recipe(self, thumbnail: Option<String>, url: &str) -> NewRecipe {
        let title = match self.title.trim() {
            "" => "Untitled recipe".to_string(),
            title => title.to_string(),
        };

        let ingredients = self
            .ingredients
            .into_iter()
            .map(|i| NewIngredient {
                name: i.name.trim().to_string(),
                quantity: i.quantity,
                unit: i.unit,
            })
            .filter(|i| !i.name.is_empty() || i.quantity.is_some() || i.unit.is_some())
            .collect();

        let instructions = self
            .instructions
            .into_iter()
            .map(|step| step.trim().to_string())
            .filter(|step| !step.is_empty())
            .collect();

        NewRecipe {
            title,
            description: self.description.trim().to_string(),
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            thumbnail,
            url: Some(url.to_string()),
            ingredients,
            instructions,
        }
    }
}

/// Picks the first `Recipe` extraction and parses its payload
pub fn recipe_draft(extractions: &[Extraction]) -> AppResult<RecipeDraft> {
    if extractions.is_empty() {
        return Err(AppError::Extraction(
            "Recipe could not be extracted".to_string(),
        ));
    }

    let extraction = extractions
        .iter()
        .find(|e| e.extraction_class.eq_ignore_ascii_case(RECIPE_CLASS))
        .ok_or_else(|| AppError::Extraction("No recipe extraction found".to_string()))?;

    let payload = match &extraction.extraction_text {
        Value::String(text) => serde_json::from_str(text).map_err(|e| {
            AppError::Extraction(format!("Recipe extraction is not valid JSON: {}", e))
        })?,
        other => other.clone(),
    };

    serde_json::from_value(payload)
        .map_err(|e| AppError::Extraction(format!("Recipe extraction has wrong shape: {}", e)))
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_to_string(Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

/// Accepts numbers and numeric strings ("1.5", "1,5", "1/2"); anything else is absent
fn lenient_quantity<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_quantity(&s),
        _ => None,
    })
}

/// Parses a quantity written as a decimal, a decimal with comma, or a simple fraction
pub fn parse_quantity(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some((num, den)) = text.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        return (den != 0.0).then(|| num / den);
    }
    text.replace(',', ".").parse().ok().filter(|q: &f64| q.is_finite())
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<DraftIngredient>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => return Ok(Vec::new()),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(DraftIngredient {
                name,
                ..Default::default()
            }),
            object @ Value::Object(_) => serde_json::from_value(object).ok(),
            _ => None,
        })
        .collect())
}

/// Steps may come as strings or as objects with a `description`/`text` field
fn lenient_steps<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::String(single) => vec![Value::String(single)],
        _ => return Ok(Vec::new()),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(mut fields) => fields
                .remove("description")
                .or_else(|| fields.remove("text"))
                .and_then(scalar_to_string),
            other => scalar_to_string(other),
        })
        .collect())
}
