use std::sync::Arc;

use super::{Caption, CaptionSource};
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::AppResult,
};

/// Redis read-through cache in front of another caption source
pub struct CachedCaptionSource {
    inner: Arc<dyn CaptionSource>,
    cache: Cache,
    ttl: u64,
}

impl CachedCaptionSource {
    pub fn new(inner: Arc<dyn CaptionSource>, cache: Cache, ttl: u64) -> Self {
        Self { inner, cache, ttl }
    }
}

#[async_trait::async_trait]
impl CaptionSource for CachedCaptionSource {
    async fn fetch_caption(&self, link: &str) -> AppResult<Caption> {
        cached!(
            self.cache,
            CacheKey::Caption(link.to_string()),
            self.ttl,
            self.inner.fetch_caption(link)
        )
    }

    async fn refresh_caption(&self, link: &str) -> AppResult<Caption> {
        let caption = self.inner.refresh_caption(link).await?;
        self.cache
            .set_in_background(&CacheKey::Caption(link.to_string()), &caption, self.ttl);
        Ok(caption)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, services::providers::MockCaptionSource};

    const LINK: &str = "https://www.tiktok.com/@chef/video/1";

    fn caption(text: &str) -> Caption {
        Caption {
            text: text.to_string(),
            thumbnail: Some("https://cdn.example/thumb.jpg".to_string()),
        }
    }

    /// Cache whose Redis server is unreachable, so every read and write fails
    async fn offline_cache() -> (Cache, crate::db::redis::CacheWriterHandle) {
        let client = redis::Client::open("redis://127.0.0.1:1").unwrap();
        Cache::new(client).await
    }

    #[tokio::test]
    async fn test_unreachable_cache_falls_through_to_inner_source() {
        let (cache, writer) = offline_cache().await;

        let mut inner = MockCaptionSource::new();
        inner.expect_name().return_const("tiktok");
        inner.expect_fetch_caption().times(2).returning(|link| {
            assert_eq!(link, LINK);
            Ok(caption("2 eggs, fry them"))
        });

        let source = CachedCaptionSource::new(Arc::new(inner), cache, 60);
        assert_eq!(source.name(), "tiktok");
        assert_eq!(source.fetch_caption(LINK).await.unwrap(), caption("2 eggs, fry them"));
        // Nothing was stored, so the second call misses again
        assert_eq!(source.fetch_caption(LINK).await.unwrap(), caption("2 eggs, fry them"));

        drop(source);
        writer.shutdown().await;
    }

    #[tokio::test]
    async fn test_refresh_bypasses_cache() {
        let (cache, writer) = offline_cache().await;

        let mut inner = MockCaptionSource::new();
        inner.expect_name().return_const("tiktok");
        inner.expect_fetch_caption().never();
        inner
            .expect_refresh_caption()
            .times(1)
            .returning(|_| Ok(caption("fresh")));

        let source = CachedCaptionSource::new(Arc::new(inner), cache, 60);
        assert_eq!(source.refresh_caption(LINK).await.unwrap(), caption("fresh"));

        drop(source);
        writer.shutdown().await;
    }

    #[tokio::test]
    async fn test_inner_errors_are_not_cached() {
        let (cache, writer) = offline_cache().await;

        let mut inner = MockCaptionSource::new();
        inner.expect_name().return_const("tiktok");
        inner
            .expect_fetch_caption()
            .times(1)
            .returning(|_| Err(AppError::ExternalApi("oEmbed unavailable".to_string())));

        let source = CachedCaptionSource::new(Arc::new(inner), cache, 60);
        assert!(matches!(
            source.fetch_caption(LINK).await,
            Err(AppError::ExternalApi(_))
        ));

        drop(source);
        writer.shutdown().await;
    }
}
