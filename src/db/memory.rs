use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::repo::{CollectionRepo, FriendRepo, RecipeRepo, SessionRepo, UserRepo};
use crate::error::{AppError, AppResult};
use crate::models::{
    Collection, Ingredient, Instruction, NewCollection, NewIngredient, NewRecipe, NewUser, Recipe,
    RecipeDetail, Session, User, UserProfile,
};

/// In-process repository used for local runs and tests
///
/// Mirrors the relational schema: ids are assigned from one counter per
/// table and deleting a recipe or collection cascades like the SQL foreign keys.
#[derive(Default)]
pub struct MemoryRepository {
    inner: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_id: HashMap<&'static str, i64>,
    users: BTreeMap<i64, User>,
    profiles: HashMap<i64, UserProfile>,
    sessions: HashMap<String, Session>,
    recipes: BTreeMap<i64, Recipe>,
    ingredients: BTreeMap<i64, Ingredient>,
    instructions: BTreeMap<i64, Instruction>,
    friends: BTreeSet<(i64, i64)>,
    collections: BTreeMap<i64, Collection>,
    collection_recipes: BTreeSet<(i64, i64)>,
}

impl MemoryState {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let id = self.next_id.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn detail(&self, recipe: &Recipe) -> RecipeDetail {
        let ingredients = self
            .ingredients
            .values()
            .filter(|i| i.recipe_id == recipe.id)
            .cloned()
            .collect();
        RecipeDetail {
            recipe: recipe.clone(),
            ingredients,
            instructions: self.instructions_of(recipe.id),
        }
    }

    fn instructions_of(&self, recipe_id: i64) -> Vec<Instruction> {
        let mut steps: Vec<Instruction> = self
            .instructions
            .values()
            .filter(|i| i.recipe_id == recipe_id)
            .cloned()
            .collect();
        steps.sort_by_key(|i| (i.step_number, i.id));
        steps
    }

    fn insert_ingredient(&mut self, recipe_id: i64, ingredient: &NewIngredient) -> Ingredient {
        let row = Ingredient {
            id: self.next_id("ingredients"),
            recipe_id,
            name: ingredient.name.clone(),
            quantity: ingredient.quantity,
            unit: ingredient.unit.clone(),
        };
        self.ingredients.insert(row.id, row.clone());
        row
    }

    fn insert_instruction(&mut self, recipe_id: i64, step_number: i32, text: &str) -> Instruction {
        let row = Instruction {
            id: self.next_id("instructions"),
            recipe_id,
            step_number,
            description: text.to_string(),
        };
        self.instructions.insert(row.id, row.clone());
        row
    }

    fn collection_name_taken(&self, user_id: i64, name: &str, except: Option<i64>) -> bool {
        self.collections
            .values()
            .any(|c| c.user_id == user_id && c.name == name && Some(c.id) != except)
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepo for MemoryRepository {
    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let mut state = self.inner.write().await;

        let taken = state.users.values().any(|u| {
            u.username == user.username || u.email.eq_ignore_ascii_case(&user.email)
        });
        if taken {
            return Err(AppError::Conflict(
                "Username or email already exists".to_string(),
            ));
        }

        let created = User {
            id: state.next_id("users"),
            username: user.username.clone(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            created_at: Utc::now(),
        };
        state.users.insert(created.id, created.clone());
        state
            .profiles
            .insert(created.id, UserProfile::empty(created.id));
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let state = self.inner.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let state = self.inner.read().await;
        Ok(state
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(email)))
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let state = self.inner.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn get_profile(&self, user_id: i64) -> AppResult<Option<UserProfile>> {
        Ok(self.inner.read().await.profiles.get(&user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> AppResult<()> {
        self.inner
            .write()
            .await
            .profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }
}

#[async_trait]
impl SessionRepo for MemoryRepository {
    async fn create_session(&self, session: &Session) -> AppResult<()> {
        self.inner
            .write()
            .await
            .sessions
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, token: &str) -> AppResult<Option<Session>> {
        Ok(self.inner.read().await.sessions.get(token).cloned())
    }

    async fn delete_session(&self, token: &str) -> AppResult<()> {
        self.inner.write().await.sessions.remove(token);
        Ok(())
    }
}

#[async_trait]
impl RecipeRepo for MemoryRepository {
    async fn create_recipe(&self, user_id: i64, recipe: &NewRecipe) -> AppResult<RecipeDetail> {
        let mut state = self.inner.write().await;

        let created = Recipe {
            id: state.next_id("recipes"),
            user_id,
            title: recipe.title.clone(),
            description: recipe.description.clone(),
            prep_time: recipe.prep_time.clone(),
            cook_time: recipe.cook_time.clone(),
            servings: recipe.servings.clone(),
            thumbnail: recipe.thumbnail.clone(),
            url: recipe.url.clone(),
        };
        state.recipes.insert(created.id, created.clone());

        let ingredients = recipe
            .ingredients
            .iter()
            .map(|i| state.insert_ingredient(created.id, i))
            .collect();
        let instructions = recipe
            .instructions
            .iter()
            .enumerate()
            .map(|(index, text)| state.insert_instruction(created.id, index as i32 + 1, text))
            .collect();

        Ok(RecipeDetail {
            recipe: created,
            ingredients,
            instructions,
        })
    }

    async fn get_recipe(&self, id: i64) -> AppResult<Option<Recipe>> {
        Ok(self.inner.read().await.recipes.get(&id).cloned())
    }

    async fn get_recipe_detail(&self, id: i64) -> AppResult<Option<RecipeDetail>> {
        let state = self.inner.read().await;
        Ok(state.recipes.get(&id).map(|r| state.detail(r)))
    }

    async fn list_recipes(&self, user_id: i64) -> AppResult<Vec<Recipe>> {
        let state = self.inner.read().await;
        Ok(state
            .recipes
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_recipe_details(&self, user_id: i64) -> AppResult<Vec<RecipeDetail>> {
        let state = self.inner.read().await;
        Ok(state
            .recipes
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .map(|r| state.detail(r))
            .collect())
    }

    async fn save_recipe(&self, recipe: &Recipe) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if let Some(existing) = state.recipes.get_mut(&recipe.id) {
            *existing = recipe.clone();
        }
        Ok(())
    }

    async fn delete_recipe(&self, id: i64) -> AppResult<()> {
        let mut state = self.inner.write().await;
        state.recipes.remove(&id);
        state.ingredients.retain(|_, i| i.recipe_id != id);
        state.instructions.retain(|_, i| i.recipe_id != id);
        state.collection_recipes.retain(|&(_, recipe_id)| recipe_id != id);
        Ok(())
    }

    async fn get_ingredient(&self, id: i64) -> AppResult<Option<Ingredient>> {
        Ok(self.inner.read().await.ingredients.get(&id).cloned())
    }

    async fn insert_ingredient(
        &self,
        recipe_id: i64,
        ingredient: &NewIngredient,
    ) -> AppResult<Ingredient> {
        Ok(self
            .inner
            .write()
            .await
            .insert_ingredient(recipe_id, ingredient))
    }

    async fn save_ingredient(&self, ingredient: &Ingredient) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if let Some(existing) = state.ingredients.get_mut(&ingredient.id) {
            *existing = ingredient.clone();
        }
        Ok(())
    }

    async fn delete_ingredient(&self, id: i64) -> AppResult<()> {
        self.inner.write().await.ingredients.remove(&id);
        Ok(())
    }

    async fn get_instruction(&self, id: i64) -> AppResult<Option<Instruction>> {
        Ok(self.inner.read().await.instructions.get(&id).cloned())
    }

    async fn list_instructions(&self, recipe_id: i64) -> AppResult<Vec<Instruction>> {
        Ok(self.inner.read().await.instructions_of(recipe_id))
    }

    async fn insert_instruction(
        &self,
        recipe_id: i64,
        step_number: i32,
        description: &str,
    ) -> AppResult<Instruction> {
        Ok(self
            .inner
            .write()
            .await
            .insert_instruction(recipe_id, step_number, description))
    }

    async fn save_instruction(&self, instruction: &Instruction) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if let Some(existing) = state.instructions.get_mut(&instruction.id) {
            *existing = instruction.clone();
        }
        Ok(())
    }

    async fn delete_instruction(&self, id: i64) -> AppResult<()> {
        self.inner.write().await.instructions.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl FriendRepo for MemoryRepository {
    async fn list_friends(&self, user_id: i64) -> AppResult<Vec<User>> {
        let state = self.inner.read().await;
        let mut friends: Vec<User> = state
            .friends
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .filter_map(|(_, friend)| state.users.get(friend).cloned())
            .collect();
        friends.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(friends)
    }

    async fn add_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        if user_id != friend_id {
            self.inner.write().await.friends.insert((user_id, friend_id));
        }
        Ok(())
    }

    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        self.inner
            .write()
            .await
            .friends
            .remove(&(user_id, friend_id));
        Ok(())
    }

    async fn is_friend(&self, user_id: i64, friend_id: i64) -> AppResult<bool> {
        Ok(self
            .inner
            .read()
            .await
            .friends
            .contains(&(user_id, friend_id)))
    }
}

#[async_trait]
impl CollectionRepo for MemoryRepository {
    async fn create_collection(
        &self,
        user_id: i64,
        collection: &NewCollection,
    ) -> AppResult<Collection> {
        let mut state = self.inner.write().await;
        if state.collection_name_taken(user_id, &collection.name, None) {
            return Err(AppError::Conflict(
                "A collection with this name already exists".to_string(),
            ));
        }

        let created = Collection {
            id: state.next_id("collections"),
            user_id,
            name: collection.name.clone(),
            description: collection.description.clone(),
            shared: collection.shared,
            created_at: Utc::now(),
        };
        state.collections.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_collection(&self, id: i64) -> AppResult<Option<Collection>> {
        Ok(self.inner.read().await.collections.get(&id).cloned())
    }

    async fn list_collections(&self, user_id: i64) -> AppResult<Vec<Collection>> {
        let state = self.inner.read().await;
        let mut collections: Vec<Collection> = state
            .collections
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        collections.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(collections)
    }

    async fn save_collection(&self, collection: &Collection) -> AppResult<()> {
        let mut state = self.inner.write().await;
        if state.collection_name_taken(collection.user_id, &collection.name, Some(collection.id)) {
            return Err(AppError::Conflict(
                "A collection with this name already exists".to_string(),
            ));
        }
        if let Some(existing) = state.collections.get_mut(&collection.id) {
            *existing = collection.clone();
        }
        Ok(())
    }

    async fn delete_collection(&self, id: i64) -> AppResult<()> {
        let mut state = self.inner.write().await;
        state.collections.remove(&id);
        state
            .collection_recipes
            .retain(|&(collection_id, _)| collection_id != id);
        Ok(())
    }

    async fn collection_recipes(&self, collection_id: i64) -> AppResult<Vec<Recipe>> {
        let state = self.inner.read().await;
        let mut recipes: Vec<Recipe> = state
            .collection_recipes
            .iter()
            .filter(|(cid, _)| *cid == collection_id)
            .filter_map(|(_, rid)| state.recipes.get(rid).cloned())
            .collect();
        recipes.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(recipes)
    }

    async fn add_collection_recipe(&self, collection_id: i64, recipe_id: i64) -> AppResult<()> {
        self.inner
            .write()
            .await
            .collection_recipes
            .insert((collection_id, recipe_id));
        Ok(())
    }

    async fn remove_collection_recipe(
        &self,
        collection_id: i64,
        recipe_id: i64,
    ) -> AppResult<()> {
        self.inner
            .write()
            .await
            .collection_recipes
            .remove(&(collection_id, recipe_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "hash".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicates() {
        let repo = MemoryRepository::new();
        repo.create_user(&new_user("anna")).await.unwrap();

        let dup_name = repo.create_user(&new_user("anna")).await;
        assert!(matches!(dup_name, Err(AppError::Conflict(_))));

        let dup_email = repo
            .create_user(&NewUser {
                username: "anna2".to_string(),
                email: "ANNA@example.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await;
        assert!(matches!(dup_email, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_user_creates_profile() {
        let repo = MemoryRepository::new();
        let user = repo.create_user(&new_user("ben")).await.unwrap();
        let profile = repo.get_profile(user.id).await.unwrap().unwrap();
        assert_eq!(profile.user_id, user.id);
        assert_eq!(profile.bio, None);
    }

    #[tokio::test]
    async fn test_recipes_listed_newest_first_with_ordered_steps() {
        let repo = MemoryRepository::new();
        let user = repo.create_user(&new_user("cara")).await.unwrap();

        let first = NewRecipe {
            title: "First".to_string(),
            instructions: vec!["chop".to_string(), "fry".to_string()],
            ..Default::default()
        };
        let second = NewRecipe {
            title: "Second".to_string(),
            ..Default::default()
        };
        let created = repo.create_recipe(user.id, &first).await.unwrap();
        repo.create_recipe(user.id, &second).await.unwrap();

        let titles: Vec<String> = repo
            .list_recipes(user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Second", "First"]);

        let steps: Vec<i32> = created.instructions.iter().map(|i| i.step_number).collect();
        assert_eq!(steps, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_delete_recipe_cascades() {
        let repo = MemoryRepository::new();
        let user = repo.create_user(&new_user("dora")).await.unwrap();
        let detail = repo
            .create_recipe(
                user.id,
                &NewRecipe {
                    title: "Soup".to_string(),
                    ingredients: vec![NewIngredient {
                        name: "leek".to_string(),
                        ..Default::default()
                    }],
                    instructions: vec!["boil".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let collection = repo
            .create_collection(
                user.id,
                &NewCollection {
                    name: "Soups".to_string(),
                    description: String::new(),
                    shared: false,
                },
            )
            .await
            .unwrap();
        repo.add_collection_recipe(collection.id, detail.recipe.id)
            .await
            .unwrap();

        repo.delete_recipe(detail.recipe.id).await.unwrap();

        assert!(repo
            .get_ingredient(detail.ingredients[0].id)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .get_instruction(detail.instructions[0].id)
            .await
            .unwrap()
            .is_none());
        assert!(repo
            .collection_recipes(collection.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_friend_edges_are_directed() {
        let repo = MemoryRepository::new();
        let a = repo.create_user(&new_user("a")).await.unwrap();
        let b = repo.create_user(&new_user("b")).await.unwrap();

        repo.add_friend(a.id, b.id).await.unwrap();
        repo.add_friend(a.id, b.id).await.unwrap();
        repo.add_friend(a.id, a.id).await.unwrap();

        assert!(repo.is_friend(a.id, b.id).await.unwrap());
        assert!(!repo.is_friend(b.id, a.id).await.unwrap());
        assert_eq!(repo.list_friends(a.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_collection_names_unique_per_user() {
        let repo = MemoryRepository::new();
        let a = repo.create_user(&new_user("a")).await.unwrap();
        let b = repo.create_user(&new_user("b")).await.unwrap();
        let new = NewCollection {
            name: "Favourites".to_string(),
            description: String::new(),
            shared: false,
        };

        repo.create_collection(a.id, &new).await.unwrap();
        repo.create_collection(b.id, &new).await.unwrap();
        let dup = repo.create_collection(a.id, &new).await;
        assert!(matches!(dup, Err(AppError::Conflict(_))));
    }
}
