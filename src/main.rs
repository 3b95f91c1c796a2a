use std::sync::Arc;

use recipe_reels::{
    config::{Config, StorageBackend},
    db::{create_pool, create_redis_client, Cache, MemoryRepository, PgRepository, Repository},
    routes::{create_router, AppState},
    services::{
        CachedCaptionSource, CaptionSource, GeminiExtractor, InstagramProvider, PlatformRouter,
        TikTokProvider,
    },
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recipe_reels=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let repo: Arc<dyn Repository> = match config.storage {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database_url).await?;
            let repo = PgRepository::new(pool);
            repo.migrate().await?;
            Arc::new(repo)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on shutdown");
            Arc::new(MemoryRepository::new())
        }
    };

    let http_client = reqwest::Client::new();

    let platforms: Arc<dyn CaptionSource> = Arc::new(PlatformRouter::new(
        Arc::new(TikTokProvider::new(
            http_client.clone(),
            config.tiktok_oembed_url.clone(),
        )),
        Arc::new(InstagramProvider::new(config.instagram_url.clone())?),
    ));

    let (captions, cache_writer): (Arc<dyn CaptionSource>, _) = match &config.redis_url {
        Some(redis_url) => {
            let (cache, writer) = Cache::new(create_redis_client(redis_url)?).await;
            tracing::info!(ttl = config.caption_cache_ttl, "Caption cache enabled");
            let cached: Arc<dyn CaptionSource> = Arc::new(CachedCaptionSource::new(
                platforms,
                cache,
                config.caption_cache_ttl,
            ));
            (cached, Some(writer))
        }
        None => (platforms, None),
    };

    let extractor = GeminiExtractor::new(
        http_client,
        config.gemini_api_key.clone(),
        config.gemini_api_url.clone(),
        config.gemini_model.clone(),
    )?;

    let state = Arc::new(AppState {
        repo,
        captions,
        extractor: Arc::new(extractor),
        bcrypt_cost: config.bcrypt_cost,
    });

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!(address = %config.bind_address(), "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
