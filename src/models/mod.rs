pub mod collection;
pub mod recipe;
pub mod user;

pub use collection::{Collection, CollectionDetail, CollectionUpdate, NewCollection};
pub use recipe::{
    Ingredient, Instruction, NewIngredient, NewRecipe, Recipe, RecipeDetail, RecipeUpdate,
};
pub use user::{NewUser, ProfileUpdate, Session, User, UserProfile, UserSummary};
