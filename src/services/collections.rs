use crate::{
    db::Repository,
    error::{AppError, AppResult},
    models::{Collection, CollectionDetail, CollectionUpdate, NewCollection},
    services::recipes::can_view,
};

fn collection_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Collection {} not found", id))
}

async fn owned_collection(repo: &dyn Repository, user_id: i64, id: i64) -> AppResult<Collection> {
    repo.get_collection(id)
        .await?
        .filter(|c| c.user_id == user_id)
        .ok_or_else(|| collection_not_found(id))
}

pub async fn create_collection(
    repo: &dyn Repository,
    user_id: i64,
    collection: NewCollection,
) -> AppResult<Collection> {
    let collection = collection.validated()?;
    let created = repo.create_collection(user_id, &collection).await?;
    tracing::info!(user_id, collection_id = created.id, "Created collection");
    Ok(created)
}

pub async fn list_collections(repo: &dyn Repository, user_id: i64) -> AppResult<Vec<Collection>> {
    repo.list_collections(user_id).await
}

/// A collection with its recipes
///
/// Readable by the owner, and by the owner's friends once it is shared.
/// Other viewers only get the recipes they could open on their own.
pub async fn collection_detail(
    repo: &dyn Repository,
    user_id: i64,
    id: i64,
) -> AppResult<CollectionDetail> {
    let collection = repo
        .get_collection(id)
        .await?
        .ok_or_else(|| collection_not_found(id))?;

    let visible = collection.user_id == user_id
        || (collection.shared && can_view(repo, user_id, collection.user_id).await?);
    if !visible {
        return Err(collection_not_found(id));
    }

    let mut recipes = repo.collection_recipes(collection.id).await?;
    if collection.user_id != user_id {
        let mut visible = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            if can_view(repo, user_id, recipe.user_id).await? {
                visible.push(recipe);
            }
        }
        recipes = visible;
    }

    Ok(CollectionDetail {
        collection,
        recipes,
    })
}

pub async fn update_collection(
    repo: &dyn Repository,
    user_id: i64,
    id: i64,
    update: CollectionUpdate,
) -> AppResult<Collection> {
    let mut collection = owned_collection(repo, user_id, id).await?;
    collection.apply(update)?;
    repo.save_collection(&collection).await?;
    Ok(collection)
}

pub async fn delete_collection(repo: &dyn Repository, user_id: i64, id: i64) -> AppResult<()> {
    let collection = owned_collection(repo, user_id, id).await?;
    repo.delete_collection(collection.id).await?;
    tracing::info!(user_id, collection_id = id, "Deleted collection");
    Ok(())
}

/// Adds a recipe the caller can see to one of their collections
pub async fn add_recipe(
    repo: &dyn Repository,
    user_id: i64,
    id: i64,
    recipe_id: i64,
) -> AppResult<()> {
    let collection = owned_collection(repo, user_id, id).await?;

    let recipe_not_found = || AppError::NotFound(format!("Recipe {} not found", recipe_id));
    let recipe = repo
        .get_recipe(recipe_id)
        .await?
        .ok_or_else(recipe_not_found)?;
    if !can_view(repo, user_id, recipe.user_id).await? {
        return Err(recipe_not_found());
    }

    repo.add_collection_recipe(collection.id, recipe.id).await
}

pub async fn remove_recipe(
    repo: &dyn Repository,
    user_id: i64,
    id: i64,
    recipe_id: i64,
) -> AppResult<()> {
    let collection = owned_collection(repo, user_id, id).await?;
    repo.remove_collection_recipe(collection.id, recipe_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{FriendRepo, MemoryRepository, RecipeRepo};
    use crate::models::NewRecipe;
    use crate::services::recipes::recipe_detail;

    fn new_collection(name: &str, shared: bool) -> NewCollection {
        NewCollection {
            name: name.to_string(),
            description: String::new(),
            shared,
        }
    }

    async fn recipe(repo: &MemoryRepository, user_id: i64, title: &str) -> i64 {
        repo.create_recipe(
            user_id,
            &NewRecipe {
                title: title.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .recipe
        .id
    }

    #[tokio::test]
    async fn test_create_validates_and_rejects_duplicates() {
        let repo = MemoryRepository::default();

        let blank = create_collection(&repo, 1, new_collection("  ", false)).await;
        assert!(matches!(blank, Err(AppError::InvalidInput(_))));

        create_collection(&repo, 1, new_collection("Soups", false))
            .await
            .unwrap();
        let duplicate = create_collection(&repo, 1, new_collection(" Soups ", false)).await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));

        // Names are unique per user only
        create_collection(&repo, 2, new_collection("Soups", false))
            .await
            .unwrap();

        let names: Vec<String> = list_collections(&repo, 1)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Soups"]);
    }

    #[tokio::test]
    async fn test_detail_visibility() {
        let repo = MemoryRepository::default();
        let private = create_collection(&repo, 1, new_collection("Private", false))
            .await
            .unwrap();
        let shared = create_collection(&repo, 1, new_collection("Shared", true))
            .await
            .unwrap();

        assert!(collection_detail(&repo, 2, shared.id).await.is_err());

        repo.add_friend(1, 2).await.unwrap();
        assert!(collection_detail(&repo, 2, shared.id).await.is_ok());
        assert!(matches!(
            collection_detail(&repo, 2, private.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(collection_detail(&repo, 1, private.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_add_and_remove_recipes() {
        let repo = MemoryRepository::default();
        let collection = create_collection(&repo, 1, new_collection("Favourites", false))
            .await
            .unwrap();
        let own = recipe(&repo, 1, "Risotto").await;
        let friends = recipe(&repo, 2, "Curry").await;
        let strangers = recipe(&repo, 3, "Secret Stew").await;
        repo.add_friend(2, 1).await.unwrap();

        add_recipe(&repo, 1, collection.id, own).await.unwrap();
        add_recipe(&repo, 1, collection.id, own).await.unwrap();
        add_recipe(&repo, 1, collection.id, friends).await.unwrap();
        assert!(matches!(
            add_recipe(&repo, 1, collection.id, strangers).await,
            Err(AppError::NotFound(_))
        ));

        let detail = collection_detail(&repo, 1, collection.id).await.unwrap();
        let titles: Vec<&str> = detail.recipes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Curry", "Risotto"]);

        remove_recipe(&repo, 1, collection.id, own).await.unwrap();
        remove_recipe(&repo, 1, collection.id, own).await.unwrap();
        let detail = collection_detail(&repo, 1, collection.id).await.unwrap();
        assert_eq!(detail.recipes.len(), 1);
    }

    #[tokio::test]
    async fn test_shared_collection_hides_recipes_the_viewer_cannot_open() {
        let repo = MemoryRepository::default();
        let (alice, bob, carol) = (1, 2, 3);
        let secret = recipe(&repo, alice, "Family Ragu").await;
        let own = recipe(&repo, bob, "Pancakes").await;
        repo.add_friend(alice, bob).await.unwrap();
        repo.add_friend(bob, carol).await.unwrap();

        let collection = create_collection(&repo, bob, new_collection("Brunch", true))
            .await
            .unwrap();
        add_recipe(&repo, bob, collection.id, secret).await.unwrap();
        add_recipe(&repo, bob, collection.id, own).await.unwrap();

        let owner_view = collection_detail(&repo, bob, collection.id).await.unwrap();
        assert_eq!(owner_view.recipes.len(), 2);

        let friend_view = collection_detail(&repo, carol, collection.id).await.unwrap();
        let titles: Vec<&str> = friend_view.recipes.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Pancakes"]);
        assert!(matches!(
            recipe_detail(&repo, carol, secret).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_delete_are_owner_only() {
        let repo = MemoryRepository::default();
        let collection = create_collection(&repo, 1, new_collection("Weeknight", false))
            .await
            .unwrap();

        let update = CollectionUpdate {
            shared: Some(true),
            ..Default::default()
        };
        assert!(update_collection(&repo, 2, collection.id, update.clone())
            .await
            .is_err());
        let updated = update_collection(&repo, 1, collection.id, update)
            .await
            .unwrap();
        assert!(updated.shared);

        assert!(delete_collection(&repo, 2, collection.id).await.is_err());
        delete_collection(&repo, 1, collection.id).await.unwrap();
        assert!(matches!(
            collection_detail(&repo, 1, collection.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
