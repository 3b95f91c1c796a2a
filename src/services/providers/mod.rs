//! Video caption providers
//!
//! Each supported short-video platform has a provider that turns a shared
//! link into the video's caption text and thumbnail. [`PlatformRouter`]
//! picks the provider from the link's host, and [`CachedCaptionSource`]
//! adds a Redis read-through cache in front of any source.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, AppResult};

pub mod cached;
pub mod instagram;
pub mod tiktok;

pub use cached::CachedCaptionSource;
pub use instagram::InstagramProvider;
pub use tiktok::TikTokProvider;

/// Caption text and thumbnail of a video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub text: String,
    pub thumbnail: Option<String>,
}

/// Short-video platforms a link can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    TikTok,
    Instagram,
}

impl Platform {
    /// Classifies a link by its host
    ///
    /// Links without a scheme (`www.tiktok.com/...`) are read as https.
    pub fn detect(link: &str) -> AppResult<Self> {
        let url = parse_link(link)?;
        let host = url
            .host_str()
            .map(|h| h.to_ascii_lowercase())
            .ok_or_else(|| AppError::InvalidInput(format!("Link has no host: {}", link)))?;

        if host_matches(&host, "tiktok.com") {
            Ok(Platform::TikTok)
        } else if host_matches(&host, "instagram.com") {
            Ok(Platform::Instagram)
        } else {
            Err(AppError::InvalidInput(format!(
                "Unsupported link, expected a TikTok or Instagram video: {}",
                link
            )))
        }
    }
}

pub(crate) fn parse_link(link: &str) -> AppResult<reqwest::Url> {
    let link = link.trim();
    match reqwest::Url::parse(link) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        Ok(_) => Err(AppError::InvalidInput(format!("Not a web link: {}", link))),
        Err(_) => reqwest::Url::parse(&format!("https://{}", link))
            .map_err(|_| AppError::InvalidInput(format!("Invalid link: {}", link))),
    }
}

fn host_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{}", domain))
}

/// Source of video captions
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CaptionSource: Send + Sync {
    /// Fetches caption and thumbnail for a video link
    async fn fetch_caption(&self, link: &str) -> AppResult<Caption>;

    /// Fetches a caption bypassing any cache, e.g. to renew an expired thumbnail
    async fn refresh_caption(&self, link: &str) -> AppResult<Caption> {
        self.fetch_caption(link).await
    }

    /// Source name for logging
    fn name(&self) -> &'static str;
}

/// Dispatches each link to the provider of its platform
pub struct PlatformRouter {
    tiktok: Arc<dyn CaptionSource>,
    instagram: Arc<dyn CaptionSource>,
}

impl PlatformRouter {
    pub fn new(tiktok: Arc<dyn CaptionSource>, instagram: Arc<dyn CaptionSource>) -> Self {
        Self { tiktok, instagram }
    }
}

#[async_trait::async_trait]
impl CaptionSource for PlatformRouter {
    async fn fetch_caption(&self, link: &str) -> AppResult<Caption> {
        let provider = match Platform::detect(link)? {
            Platform::TikTok => &self.tiktok,
            Platform::Instagram => &self.instagram,
        };

        tracing::debug!(provider = provider.name(), link = %link, "Fetching caption");
        provider.fetch_caption(link).await
    }

    fn name(&self) -> &'static str {
        "router"
    }
}
