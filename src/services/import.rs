use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::RecipeDetail,
    services::{
        extractor::{recipe_draft, RecipeExtractor},
        providers::{CaptionSource, Platform},
    },
};

/// Imports a recipe from a short-video link
///
/// Fetches the caption of the video, runs structured extraction over it and
/// stores the first extracted recipe for `user_id`, together with the
/// video's thumbnail and the link itself.
pub async fn import_recipe(
    repo: &dyn Repository,
    captions: &dyn CaptionSource,
    extractor: &dyn RecipeExtractor,
    user_id: i64,
    link: &str,
) -> AppResult<RecipeDetail> {
    let link = link.trim();
    if link.is_empty() {
        return Err(AppError::InvalidInput("Link is required".to_string()));
    }

    let platform = Platform::detect(link)?;

    let caption = captions.fetch_caption(link).await?;
    if caption.text.trim().is_empty() {
        return Err(AppError::Extraction("Video has no caption".to_string()));
    }

    let extractions = extractor.extract(&caption.text).await?;
    let draft = recipe_draft(&extractions)?;
    let recipe = draft.into_new_recipe(caption.thumbnail, link);

    let detail = repo.create_recipe(user_id, &recipe).await?;

    tracing::info!(
        user_id,
        recipe_id = detail.recipe.id,
        platform = ?platform,
        source = captions.name(),
        extractor = extractor.name(),
        ingredient_count = detail.ingredients.len(),
        instruction_count = detail.instructions.len(),
        "Imported recipe"
    );

    Ok(detail)
}
