use serde::Serialize;

use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{NewRecipe, Recipe, RecipeDetail, RecipeUpdate},
    services::{
        providers::CaptionSource,
        search::{self, SearchHit},
    },
};

/// Result of listing a user's recipes
///
/// Serializes as a bare array: plain recipes without a query, ranked hits
/// with their score otherwise.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RecipeListing {
    All(Vec<Recipe>),
    Matches(Vec<SearchHit>),
}

/// Whether `viewer` may read a recipe of `owner`
///
/// Owners share their recipes with every user they have added as a friend.
pub async fn can_view(repo: &dyn Repository, viewer: i64, owner: i64) -> AppResult<bool> {
    if viewer == owner {
        return Ok(true);
    }
    repo.is_friend(owner, viewer).await
}

/// Loads a recipe owned by `user_id`; other users' recipes read as missing
pub async fn owned_recipe(repo: &dyn Repository, user_id: i64, id: i64) -> AppResult<Recipe> {
    repo.get_recipe(id)
        .await?
        .filter(|r| r.user_id == user_id)
        .ok_or_else(|| recipe_not_found(id))
}

fn recipe_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Recipe {} not found", id))
}

/// Lists the caller's recipes, fuzzy-ranked when `query` has any terms
pub async fn list_recipes(
    repo: &dyn Repository,
    user_id: i64,
    query: Option<&str>,
) -> AppResult<RecipeListing> {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => {
            let details = repo.list_recipe_details(user_id).await?;
            let candidates = details.len();
            let hits = search::rank(query, details);
            tracing::debug!(
                user_id,
                query,
                candidates,
                matches = hits.len(),
                "Searched recipes"
            );
            Ok(RecipeListing::Matches(hits))
        }
        None => Ok(RecipeListing::All(repo.list_recipes(user_id).await?)),
    }
}

/// Creates a recipe from a manual form
pub async fn create_recipe(
    repo: &dyn Repository,
    user_id: i64,
    mut recipe: NewRecipe,
) -> AppResult<RecipeDetail> {
    recipe.title = recipe.title.trim().to_string();
    if recipe.title.is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()));
    }
    recipe
        .instructions
        .retain(|step| !step.trim().is_empty());

    let detail = repo.create_recipe(user_id, &recipe).await?;
    tracing::info!(user_id, recipe_id = detail.recipe.id, "Created recipe");
    Ok(detail)
}

pub async fn recipe_detail(
    repo: &dyn Repository,
    user_id: i64,
    id: i64,
) -> AppResult<RecipeDetail> {
    let detail = repo
        .get_recipe_detail(id)
        .await?
        .ok_or_else(|| recipe_not_found(id))?;

    if !can_view(repo, user_id, detail.recipe.user_id).await? {
        return Err(recipe_not_found(id));
    }
    Ok(detail)
}

pub async fn update_recipe(
    repo: &dyn Repository,
    user_id: i64,
    id: i64,
    update: RecipeUpdate,
) -> AppResult<Recipe> {
    let mut recipe = owned_recipe(repo, user_id, id).await?;
    recipe.apply(update)?;
    repo.save_recipe(&recipe).await?;
    Ok(recipe)
}

pub async fn delete_recipe(repo: &dyn Repository, user_id: i64, id: i64) -> AppResult<()> {
    let recipe = owned_recipe(repo, user_id, id).await?;
    repo.delete_recipe(recipe.id).await?;
    tracing::info!(user_id, recipe_id = id, "Deleted recipe");
    Ok(())
}

/// Re-reads the source video to replace an expired thumbnail link
///
/// Returns the new thumbnail, which may be absent when the video has none.
pub async fn refresh_thumbnail(
    repo: &dyn Repository,
    captions: &dyn CaptionSource,
    user_id: i64,
    id: i64,
) -> AppResult<Option<String>> {
    let mut recipe = owned_recipe(repo, user_id, id).await?;
    let url = recipe
        .url
        .clone()
        .ok_or_else(|| AppError::InvalidInput("Recipe has no source link".to_string()))?;

    let caption = captions.refresh_caption(&url).await?;
    recipe.thumbnail = caption.thumbnail;
    repo.save_recipe(&recipe).await?;

    tracing::info!(
        user_id,
        recipe_id = id,
        source = captions.name(),
        has_thumbnail = recipe.thumbnail.is_some(),
        "Refreshed recipe thumbnail"
    );

    Ok(recipe.thumbnail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FriendRepo, MemoryRepository, RecipeRepo};
    use crate::models::NewIngredient;
    use crate::services::providers::{Caption, MockCaptionSource};

    fn new_recipe(title: &str, ingredients: &[&str]) -> NewRecipe {
        NewRecipe {
            title: title.to_string(),
            ingredients: ingredients
                .iter()
                .map(|name| NewIngredient {
                    name: name.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_requires_title() {
        let repo = MemoryRepository::default();
        let result = create_recipe(&repo, 1, new_recipe("   ", &[])).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_numbers_non_blank_steps() {
        let repo = MemoryRepository::default();
        let mut recipe = new_recipe(" Omelette ", &["eggs"]);
        recipe.instructions = vec!["Whisk.".to_string(), " ".to_string(), "Fry.".to_string()];

        let detail = create_recipe(&repo, 1, recipe).await.unwrap();
        assert_eq!(detail.recipe.title, "Omelette");
        let steps: Vec<(i32, &str)> = detail
            .instructions
            .iter()
            .map(|i| (i.step_number, i.description.as_str()))
            .collect();
        assert_eq!(steps, vec![(1, "Whisk."), (2, "Fry.")]);
    }

    #[tokio::test]
    async fn test_list_with_and_without_query() {
        let repo = MemoryRepository::default();
        create_recipe(&repo, 1, new_recipe("Tomato Soup", &["tomatoes", "basil"]))
            .await
            .unwrap();
        create_recipe(&repo, 1, new_recipe("Pancakes", &["flour", "milk"]))
            .await
            .unwrap();
        create_recipe(&repo, 2, new_recipe("Tomato Salad", &["tomatoes"]))
            .await
            .unwrap();

        match list_recipes(&repo, 1, None).await.unwrap() {
            RecipeListing::All(recipes) => {
                let titles: Vec<&str> = recipes.iter().map(|r| r.title.as_str()).collect();
                assert_eq!(titles, vec!["Pancakes", "Tomato Soup"]);
            }
            other => panic!("expected all recipes, got {:?}", other),
        }

        match list_recipes(&repo, 1, Some("  ")).await.unwrap() {
            RecipeListing::All(recipes) => assert_eq!(recipes.len(), 2),
            other => panic!("expected all recipes, got {:?}", other),
        }

        match list_recipes(&repo, 1, Some("tomato")).await.unwrap() {
            RecipeListing::Matches(hits) => {
                assert_eq!(hits.len(), 1);
                assert_eq!(hits[0].recipe.title, "Tomato Soup");
                assert_eq!(hits[0].score, 100.0);
            }
            other => panic!("expected matches, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_detail_visible_to_friends_only() {
        let repo = MemoryRepository::default();
        let detail = create_recipe(&repo, 1, new_recipe("Dal", &["lentils"]))
            .await
            .unwrap();
        let id = detail.recipe.id;

        assert!(recipe_detail(&repo, 1, id).await.is_ok());
        assert!(matches!(
            recipe_detail(&repo, 2, id).await,
            Err(AppError::NotFound(_))
        ));

        // Owner 1 shares with 2 by adding them; the reverse edge does not count
        repo.add_friend(2, 1).await.unwrap();
        assert!(recipe_detail(&repo, 2, id).await.is_err());
        repo.add_friend(1, 2).await.unwrap();
        assert_eq!(recipe_detail(&repo, 2, id).await.unwrap(), detail);
    }

    #[tokio::test]
    async fn test_update_and_delete_are_owner_only() {
        let repo = MemoryRepository::default();
        let id = create_recipe(&repo, 1, new_recipe("Chili", &[]))
            .await
            .unwrap()
            .recipe
            .id;
        repo.add_friend(1, 2).await.unwrap();

        let update = RecipeUpdate {
            servings: Some("4".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            update_recipe(&repo, 2, id, update.clone()).await,
            Err(AppError::NotFound(_))
        ));
        let updated = update_recipe(&repo, 1, id, update).await.unwrap();
        assert_eq!(updated.servings.as_deref(), Some("4"));

        assert!(delete_recipe(&repo, 2, id).await.is_err());
        delete_recipe(&repo, 1, id).await.unwrap();
        assert_eq!(repo.get_recipe(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_refresh_thumbnail() {
        let repo = MemoryRepository::default();
        let mut recipe = new_recipe("Gnocchi", &[]);
        recipe.url = Some("https://www.tiktok.com/@chef/video/1".to_string());
        recipe.thumbnail = Some("https://cdn.example/expired.jpg".to_string());
        let id = create_recipe(&repo, 1, recipe).await.unwrap().recipe.id;

        let mut captions = MockCaptionSource::new();
        captions.expect_name().return_const("stub");
        captions
            .expect_refresh_caption()
            .times(1)
            .returning(|link| {
                assert_eq!(link, "https://www.tiktok.com/@chef/video/1");
                Ok(Caption {
                    text: "caption".to_string(),
                    thumbnail: Some("https://cdn.example/fresh.jpg".to_string()),
                })
            });

        let thumbnail = refresh_thumbnail(&repo, &captions, 1, id).await.unwrap();
        assert_eq!(thumbnail.as_deref(), Some("https://cdn.example/fresh.jpg"));
        let stored = repo.get_recipe(id).await.unwrap().unwrap();
        assert_eq!(stored.thumbnail, thumbnail);
    }

    #[tokio::test]
    async fn test_refresh_thumbnail_without_link() {
        let repo = MemoryRepository::default();
        let id = create_recipe(&repo, 1, new_recipe("Manual", &[]))
            .await
            .unwrap()
            .recipe
            .id;

        let result = refresh_thumbnail(&repo, &MockCaptionSource::new(), 1, id).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
