use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::repo::{CollectionRepo, FriendRepo, RecipeRepo, SessionRepo, UserRepo};
use crate::error::{AppError, AppResult};
use crate::models::{
    Collection, Ingredient, Instruction, NewCollection, NewIngredient, NewRecipe, NewUser, Recipe,
    RecipeDetail, Session, User, UserProfile,
};

const RECIPE_COLUMNS: &str =
    "id, user_id, title, description, prep_time, cook_time, servings, thumbnail, url";
const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";
const COLLECTION_COLUMNS: &str = "id, user_id, name, description, shared, created_at";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Maps a unique-constraint violation to `Conflict`, anything else to `Database`
fn conflict_on_unique(error: sqlx::Error, message: &str) -> AppError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(error),
    }
}

/// Repository backed by PostgreSQL
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending migrations from `migrations/`
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        tracing::info!("Database migrations applied");
        Ok(())
    }

    async fn ingredients_for(&self, recipe_ids: &[i64]) -> AppResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, Ingredient>(
            "SELECT id, recipe_id, name, quantity, unit FROM ingredients \
             WHERE recipe_id = ANY($1) ORDER BY id",
        )
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn instructions_for(&self, recipe_ids: &[i64]) -> AppResult<Vec<Instruction>> {
        let rows = sqlx::query_as::<_, Instruction>(
            "SELECT id, recipe_id, step_number, description FROM instructions \
             WHERE recipe_id = ANY($1) ORDER BY step_number, id",
        )
        .bind(recipe_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Attaches ingredients and instructions to recipes, keeping recipe order
    async fn with_children(&self, recipes: Vec<Recipe>) -> AppResult<Vec<RecipeDetail>> {
        if recipes.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();

        let mut ingredients: HashMap<i64, Vec<Ingredient>> = HashMap::new();
        for ingredient in self.ingredients_for(&ids).await? {
            ingredients
                .entry(ingredient.recipe_id)
                .or_default()
                .push(ingredient);
        }

        let mut instructions: HashMap<i64, Vec<Instruction>> = HashMap::new();
        for instruction in self.instructions_for(&ids).await? {
            instructions
                .entry(instruction.recipe_id)
                .or_default()
                .push(instruction);
        }

        Ok(recipes
            .into_iter()
            .map(|recipe| RecipeDetail {
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                instructions: instructions.remove(&recipe.id).unwrap_or_default(),
                recipe,
            })
            .collect())
    }
}

#[async_trait]
impl UserRepo for PgRepository {
    async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "Username or email already exists"))?;

        sqlx::query("INSERT INTO user_profiles (user_id) VALUES ($1)")
            .bind(created.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE lower(email) = lower($1))")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY username"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn get_profile(&self, user_id: i64) -> AppResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(
            "SELECT user_id, display_name, bio, updated_at FROM user_profiles WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn save_profile(&self, profile: &UserProfile) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO user_profiles (user_id, display_name, bio, updated_at) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (user_id) DO UPDATE \
             SET display_name = EXCLUDED.display_name, bio = EXCLUDED.bio, \
                 updated_at = EXCLUDED.updated_at",
        )
        .bind(profile.user_id)
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepo for PgRepository {
    async fn create_session(&self, session: &Session) -> AppResult<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES ($1, $2, $3)")
            .bind(&session.token)
            .bind(session.user_id)
            .bind(session.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_session(&self, token: &str) -> AppResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT token, user_id, created_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn delete_session(&self, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RecipeRepo for PgRepository {
    async fn create_recipe(&self, user_id: i64, recipe: &NewRecipe) -> AppResult<RecipeDetail> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Recipe>(&format!(
            "INSERT INTO recipes \
             (user_id, title, description, prep_time, cook_time, servings, thumbnail, url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {RECIPE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(&recipe.prep_time)
        .bind(&recipe.cook_time)
        .bind(&recipe.servings)
        .bind(&recipe.thumbnail)
        .bind(&recipe.url)
        .fetch_one(&mut *tx)
        .await?;

        let mut ingredients = Vec::with_capacity(recipe.ingredients.len());
        for ingredient in &recipe.ingredients {
            let row = sqlx::query_as::<_, Ingredient>(
                "INSERT INTO ingredients (recipe_id, name, quantity, unit) \
                 VALUES ($1, $2, $3, $4) RETURNING id, recipe_id, name, quantity, unit",
            )
            .bind(created.id)
            .bind(&ingredient.name)
            .bind(ingredient.quantity)
            .bind(&ingredient.unit)
            .fetch_one(&mut *tx)
            .await?;
            ingredients.push(row);
        }

        let mut instructions = Vec::with_capacity(recipe.instructions.len());
        for (index, description) in recipe.instructions.iter().enumerate() {
            let row = sqlx::query_as::<_, Instruction>(
                "INSERT INTO instructions (recipe_id, step_number, description) \
                 VALUES ($1, $2, $3) RETURNING id, recipe_id, step_number, description",
            )
            .bind(created.id)
            .bind(index as i32 + 1)
            .bind(description)
            .fetch_one(&mut *tx)
            .await?;
            instructions.push(row);
        }

        tx.commit().await?;

        Ok(RecipeDetail {
            recipe: created,
            ingredients,
            instructions,
        })
    }

    async fn get_recipe(&self, id: i64) -> AppResult<Option<Recipe>> {
        let recipe = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(recipe)
    }

    async fn get_recipe_detail(&self, id: i64) -> AppResult<Option<RecipeDetail>> {
        let Some(recipe) = self.get_recipe(id).await? else {
            return Ok(None);
        };
        Ok(self.with_children(vec![recipe]).await?.pop())
    }

    async fn list_recipes(&self, user_id: i64) -> AppResult<Vec<Recipe>> {
        let recipes = sqlx::query_as::<_, Recipe>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE user_id = $1 ORDER BY id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(recipes)
    }

    async fn list_recipe_details(&self, user_id: i64) -> AppResult<Vec<RecipeDetail>> {
        let recipes = self.list_recipes(user_id).await?;
        self.with_children(recipes).await
    }

    async fn save_recipe(&self, recipe: &Recipe) -> AppResult<()> {
        sqlx::query(
            "UPDATE recipes SET title = $2, description = $3, prep_time = $4, cook_time = $5, \
             servings = $6, thumbnail = $7, url = $8 WHERE id = $1",
        )
        .bind(recipe.id)
        .bind(&recipe.title)
        .bind(&recipe.description)
        .bind(&recipe.prep_time)
        .bind(&recipe.cook_time)
        .bind(&recipe.servings)
        .bind(&recipe.thumbnail)
        .bind(&recipe.url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_recipe(&self, id: i64) -> AppResult<()> {
        // Children and collection memberships go with ON DELETE CASCADE
        sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_ingredient(&self, id: i64) -> AppResult<Option<Ingredient>> {
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "SELECT id, recipe_id, name, quantity, unit FROM ingredients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(ingredient)
    }

    async fn insert_ingredient(
        &self,
        recipe_id: i64,
        ingredient: &NewIngredient,
    ) -> AppResult<Ingredient> {
        let row = sqlx::query_as::<_, Ingredient>(
            "INSERT INTO ingredients (recipe_id, name, quantity, unit) \
             VALUES ($1, $2, $3, $4) RETURNING id, recipe_id, name, quantity, unit",
        )
        .bind(recipe_id)
        .bind(&ingredient.name)
        .bind(ingredient.quantity)
        .bind(&ingredient.unit)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn save_ingredient(&self, ingredient: &Ingredient) -> AppResult<()> {
        sqlx::query("UPDATE ingredients SET name = $2, quantity = $3, unit = $4 WHERE id = $1")
            .bind(ingredient.id)
            .bind(&ingredient.name)
            .bind(ingredient.quantity)
            .bind(&ingredient.unit)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_ingredient(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM ingredients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_instruction(&self, id: i64) -> AppResult<Option<Instruction>> {
        let instruction = sqlx::query_as::<_, Instruction>(
            "SELECT id, recipe_id, step_number, description FROM instructions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(instruction)
    }

    async fn list_instructions(&self, recipe_id: i64) -> AppResult<Vec<Instruction>> {
        self.instructions_for(&[recipe_id]).await
    }

    async fn insert_instruction(
        &self,
        recipe_id: i64,
        step_number: i32,
        description: &str,
    ) -> AppResult<Instruction> {
        let row = sqlx::query_as::<_, Instruction>(
            "INSERT INTO instructions (recipe_id, step_number, description) \
             VALUES ($1, $2, $3) RETURNING id, recipe_id, step_number, description",
        )
        .bind(recipe_id)
        .bind(step_number)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn save_instruction(&self, instruction: &Instruction) -> AppResult<()> {
        sqlx::query("UPDATE instructions SET step_number = $2, description = $3 WHERE id = $1")
            .bind(instruction.id)
            .bind(instruction.step_number)
            .bind(&instruction.description)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_instruction(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM instructions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl FriendRepo for PgRepository {
    async fn list_friends(&self, user_id: i64) -> AppResult<Vec<User>> {
        let friends = sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.email, u.password_hash, u.created_at \
             FROM friends f JOIN users u ON u.id = f.friend_id \
             WHERE f.user_id = $1 ORDER BY u.username",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(friends)
    }

    async fn add_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO friends (user_id, friend_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(friend_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_friend(&self, user_id: i64, friend_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM friends WHERE user_id = $1 AND friend_id = $2")
            .bind(user_id)
            .bind(friend_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_friend(&self, user_id: i64, friend_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM friends WHERE user_id = $1 AND friend_id = $2)",
        )
        .bind(user_id)
        .bind(friend_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl CollectionRepo for PgRepository {
    async fn create_collection(
        &self,
        user_id: i64,
        collection: &NewCollection,
    ) -> AppResult<Collection> {
        let created = sqlx::query_as::<_, Collection>(&format!(
            "INSERT INTO collections (user_id, name, description, shared, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {COLLECTION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&collection.name)
        .bind(&collection.description)
        .bind(collection.shared)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A collection with this name already exists"))?;
        Ok(created)
    }

    async fn get_collection(&self, id: i64) -> AppResult<Option<Collection>> {
        let collection = sqlx::query_as::<_, Collection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(collection)
    }

    async fn list_collections(&self, user_id: i64) -> AppResult<Vec<Collection>> {
        let collections = sqlx::query_as::<_, Collection>(&format!(
            "SELECT {COLLECTION_COLUMNS} FROM collections WHERE user_id = $1 ORDER BY name, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(collections)
    }

    async fn save_collection(&self, collection: &Collection) -> AppResult<()> {
        sqlx::query(
            "UPDATE collections SET name = $2, description = $3, shared = $4 WHERE id = $1",
        )
        .bind(collection.id)
        .bind(&collection.name)
        .bind(&collection.description)
        .bind(collection.shared)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "A collection with this name already exists"))?;
        Ok(())
    }

    async fn delete_collection(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM collections WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn collection_recipes(&self, collection_id: i64) -> AppResult<Vec<Recipe>> {
        let recipes = sqlx::query_as::<_, Recipe>(
            "SELECT r.id, r.user_id, r.title, r.description, r.prep_time, r.cook_time, \
                    r.servings, r.thumbnail, r.url \
             FROM collection_recipes cr JOIN recipes r ON r.id = cr.recipe_id \
             WHERE cr.collection_id = $1 ORDER BY r.id DESC",
        )
        .bind(collection_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(recipes)
    }

    async fn add_collection_recipe(&self, collection_id: i64, recipe_id: i64) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO collection_recipes (collection_id, recipe_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(collection_id)
        .bind(recipe_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_collection_recipe(
        &self,
        collection_id: i64,
        recipe_id: i64,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM collection_recipes WHERE collection_id = $1 AND recipe_id = $2")
            .bind(collection_id)
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
