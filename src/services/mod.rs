pub mod accounts;
pub mod collections;
pub mod extractor;
pub mod friends;
pub mod import;
pub mod inline_edit;
pub mod profiles;
pub mod providers;
pub mod recipes;
pub mod search;

pub use extractor::{GeminiExtractor, RecipeExtractor};
pub use providers::{CachedCaptionSource, CaptionSource, InstagramProvider, PlatformRouter, TikTokProvider};
