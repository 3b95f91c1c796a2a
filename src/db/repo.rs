use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    Collection, Ingredient, Instruction, NewCollection, NewIngredient, NewRecipe, NewUser, Recipe,
    RecipeDetail, Session, User, UserProfile,
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Inserts a user; fails with `Conflict` when username or email is taken
    async fn create_user(&self, user: &NewUser) -> AppResult<User>;
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn email_exists(&self, email: &str) -> AppResult<bool>;
    /// All users ordered by username
    async fn list_users(&self) -> AppResult<Vec<User>>;
    async fn get_profile(&self, user_id: i64) -> AppResult<Option<UserProfile>>;
    async fn save_profile(&self, profile: &UserProfile) -> AppResult<()>;
}

#[async_trait]
pub trait SessionRepo: Send + Sync {
    async fn create_session(&self, session: &Session) -> AppResult<()>;
    async fn get_session(&self, token: &str) -> AppResult<Option<Session>>;
    async fn delete_session(&self, token: &str) -> AppResult<()>;
}

#[async_trait]
pub trait RecipeRepo: Send + Sync {
    /// Inserts a recipe with its ingredients and numbered instructions
    async fn create_recipe(&self, user_id: i64, recipe: &NewRecipe) -> AppResult<RecipeDetail>;
    async fn get_recipe(&self, id: i64) -> AppResult<Option<Recipe>>;
    async fn get_recipe_detail(&self, id: i64) -> AppResult<Option<RecipeDetail>>;
    /// A user's recipes, newest first
    async fn list_recipes(&self, user_id: i64) -> AppResult<Vec<Recipe>>;
    /// A user's recipes with children, newest first
    async fn list_recipe_details(&self, user_id: i64) -> AppResult<Vec<RecipeDetail>>;
    async fn save_recipe(&self, recipe: &Recipe) -> AppResult<()>;
    /// Deletes a recipe and everything hanging off it
    async fn delete_recipe(&self, id: i64) -> AppResult<()>;

    async fn get_ingredient(&self, id: i64) -> AppResult<Option<Ingredient>>;
    async fn insert_ingredient(
        &self,
        recipe_id: i64,
        ingredient: &NewIngredient,
    ) -> AppResult<Ingredient>;
    async fn save_ingredient(&self, ingredient: &Ingredient) -> AppResult<()>;
    async fn delete_ingredient(&self, id: i64) -> AppResult<()>;

    async fn get_instruction(&self, id: i64) -> AppResult<Option<Instruction>>;
    /// Steps of a recipe ordered by step number
    async fn list_instructions(&self, recipe_id: i64) -> AppResult<Vec<Instruction>>;
    async fn insert_instruction(
        &self,
        recipe_id: i64,
        step_number: i32,
        description: &str,
    ) -> AppResult<Instruction>;
    async fn save_instruction(&self, instruction: &Instruction) -> AppResult<()>;
    async fn delete_instruction(&self, id: i64) -> AppResult<()>;
}

/// Directed friend edges: `user_id` has added `friend_id`
#[async_trait]
pub trait FriendRepo: Send + Sync {
    /// Friends of a user ordered by username
    async fn list_friends(&self, user_id: i64) -> AppResult<Vec<User>>;
    /// Adds an edge; adding an existing edge is a no-op
    async fn add_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()>;
    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()>;
    async fn is_friend(&self, user_id: i64, friend_id: i64) -> AppResult<bool>;
}

#[async_trait]
pub trait CollectionRepo: Send + Sync {
    /// Fails with `Conflict` when the user already has a collection of that name
    async fn create_collection(
        &self,
        user_id: i64,
        collection: &NewCollection,
    ) -> AppResult<Collection>;
    async fn get_collection(&self, id: i64) -> AppResult<Option<Collection>>;
    /// A user's collections ordered by name
    async fn list_collections(&self, user_id: i64) -> AppResult<Vec<Collection>>;
    async fn save_collection(&self, collection: &Collection) -> AppResult<()>;
    async fn delete_collection(&self, id: i64) -> AppResult<()>;
    /// Recipes in a collection, newest first
    async fn collection_recipes(&self, collection_id: i64) -> AppResult<Vec<Recipe>>;
    async fn add_collection_recipe(&self, collection_id: i64, recipe_id: i64) -> AppResult<()>;
    async fn remove_collection_recipe(&self, collection_id: i64, recipe_id: i64)
        -> AppResult<()>;
}

pub trait Repository: UserRepo + SessionRepo + RecipeRepo + FriendRepo + CollectionRepo {}

impl<T> Repository for T where T: UserRepo + SessionRepo + RecipeRepo + FriendRepo + CollectionRepo {}
