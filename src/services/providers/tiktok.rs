//! TikTok caption provider
//!
//! TikTok's public oEmbed endpoint returns the video caption as `title` and a
//! signed, expiring `thumbnail_url`. No API key is needed.

use reqwest::Client as HttpClient;
use serde::Deserialize;

use super::{Caption, CaptionSource};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

impl From<OEmbedResponse> for Caption {
    fn from(response: OEmbedResponse) -> Self {
        Caption {
            text: response.title.unwrap_or_default(),
            thumbnail: response.thumbnail_url.filter(|t| !t.trim().is_empty()),
        }
    }
}

#[derive(Clone)]
pub struct TikTokProvider {
    http_client: HttpClient,
    oembed_url: String,
}

impl TikTokProvider {
    pub fn new(http_client: HttpClient, oembed_url: String) -> Self {
        Self {
            http_client,
            oembed_url,
        }
    }
}

#[async_trait::async_trait]
impl CaptionSource for TikTokProvider {
    async fn fetch_caption(&self, link: &str) -> AppResult<Caption> {
        let response = self
            .http_client
            .get(&self.oembed_url)
            .query(&[("url", link.trim())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TikTok oEmbed returned status {}: {}",
                status, body
            )));
        }

        let oembed: OEmbedResponse = response.json().await?;
        let caption = Caption::from(oembed);

        tracing::info!(
            provider = self.name(),
            caption_len = caption.text.len(),
            has_thumbnail = caption.thumbnail.is_some(),
            "Fetched TikTok caption"
        );

        Ok(caption)
    }

    fn name(&self) -> &'static str {
        "tiktok"
    }
}
