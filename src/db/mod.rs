pub mod memory;
pub mod postgres;
pub mod redis;
pub mod repo;

pub use memory::MemoryRepository;
pub use postgres::{create_pool, PgRepository};
pub use redis::create_redis_client;
pub use redis::Cache;
pub use redis::CacheKey;
pub use repo::{CollectionRepo, FriendRepo, RecipeRepo, Repository, SessionRepo, UserRepo};
