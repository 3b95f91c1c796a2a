//! Instagram caption provider
//!
//! Instagram has no unauthenticated caption API, so the public post page is
//! fetched and the caption read from its Open Graph `<meta>` tags.

use regex::Regex;
use reqwest::Client as HttpClient;
use std::collections::HashMap;
use std::sync::OnceLock;

use super::{parse_link, Caption, CaptionSource};
use crate::error::{AppError, AppResult};

const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; facebookexternalhit/1.1; +http://www.facebook.com/externalhit_uatext.php)";

static META_TAG: OnceLock<Regex> = OnceLock::new();
static ATTRIBUTE: OnceLock<Regex> = OnceLock::new();

fn meta_tag() -> &'static Regex {
    META_TAG.get_or_init(|| Regex::new(r"(?is)<meta\s[^>]*>").unwrap())
}

fn attribute() -> &'static Regex {
    ATTRIBUTE.get_or_init(|| Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*"([^"]*)""#).unwrap())
}

/// Extracts the post shortcode from a reel or post link
///
/// The shortcode is the last non-empty path segment; query and fragment
/// are ignored.
pub fn shortcode(link: &str) -> AppResult<String> {
    let url = parse_link(link)?;
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .ok_or_else(|| AppError::InvalidInput(format!("No Instagram post in link: {}", link)))
}

/// Collects `og:*` meta properties of an HTML page, entity-decoded
fn open_graph(html: &str) -> HashMap<String, String> {
    let mut properties = HashMap::new();
    for tag in meta_tag().find_iter(html) {
        let mut property = None;
        let mut content = None;
        for attr in attribute().captures_iter(tag.as_str()) {
            match attr[1].to_ascii_lowercase().as_str() {
                "property" | "name" => property = Some(attr[2].to_string()),
                "content" => content = Some(decode_entities(&attr[2])),
                _ => {}
            }
        }
        if let (Some(property), Some(content)) = (property, content) {
            if property.starts_with("og:") {
                properties.entry(property).or_insert(content);
            }
        }
    }
    properties
}

/// Strips Instagram's `N likes, M comments - user on DATE: "..."` wrapper
fn caption_from_description(description: &str) -> String {
    if let Some(start) = description.find(": \"") {
        let quoted = &description[start + 3..];
        if let Some(end) = quoted.rfind('"') {
            return quoted[..end].trim().to_string();
        }
    }
    description.trim().to_string()
}

/// Decodes the HTML entities that show up in meta content attributes
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
            let entity = &rest[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });

        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

#[derive(Clone)]
pub struct InstagramProvider {
    http_client: HttpClient,
    base_url: String,
}

impl InstagramProvider {
    pub fn new(base_url: String) -> AppResult<Self> {
        let http_client = HttpClient::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait::async_trait]
impl CaptionSource for InstagramProvider {
    async fn fetch_caption(&self, link: &str) -> AppResult<Caption> {
        let code = shortcode(link)?;
        let url = format!("{}/p/{}/", self.base_url, code);

        let response = self.http_client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::ExternalApi(format!(
                "Instagram returned status {} for post {}",
                response.status(),
                code
            )));
        }

        let html = response.text().await?;
        let mut og = open_graph(&html);

        let description = og.remove("og:description").ok_or_else(|| {
            AppError::ExternalApi(format!("Instagram post {} has no public caption", code))
        })?;

        let caption = Caption {
            text: caption_from_description(&description),
            thumbnail: og.remove("og:image").filter(|t| !t.is_empty()),
        };

        tracing::info!(
            provider = self.name(),
            shortcode = %code,
            caption_len = caption.text.len(),
            has_thumbnail = caption.thumbnail.is_some(),
            "Fetched Instagram caption"
        );

        Ok(caption)
    }

    fn name(&self) -> &'static str {
        "instagram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortcode_variants() {
        assert_eq!(
            shortcode("https://www.instagram.com/reel/C1a2b3c4d5e/").unwrap(),
            "C1a2b3c4d5e"
        );
        assert_eq!(
            shortcode("https://www.instagram.com/p/C1a2b3c4d5e?igsh=MTc4").unwrap(),
            "C1a2b3c4d5e"
        );
        assert_eq!(
            shortcode("instagram.com/reel/XyZ#comments").unwrap(),
            "XyZ"
        );
    }

    #[test]
    fn test_shortcode_missing() {
        assert!(shortcode("https://www.instagram.com/").is_err());
    }

    #[test]
    fn test_open_graph_reads_meta_tags() {
        let html = r#"
            <html><head>
            <meta property="og:title" content="Chef on Instagram">
            <meta content="https://scontent.cdninstagram.com/v/t51/img.jpg?x=1&amp;y=2" property="og:image" />
            <meta property="og:description" content="1,234 likes, 56 comments - chef on May 1, 2024: &quot;Lemon pasta &#x1F34B; 200g spaghetti&quot;. " />
            <meta name="viewport" content="width=device-width">
            </head></html>
        "#;

        let og = open_graph(html);
        assert_eq!(
            og.get("og:image").map(String::as_str),
            Some("https://scontent.cdninstagram.com/v/t51/img.jpg?x=1&y=2")
        );
        let description = og.get("og:description").unwrap();
        assert_eq!(
            caption_from_description(description),
            "Lemon pasta 🍋 200g spaghetti"
        );
        assert!(!og.contains_key("viewport"));
    }

    #[test]
    fn test_caption_without_wrapper() {
        assert_eq!(
            caption_from_description("  Just a caption  "),
            "Just a caption"
        );
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;3 &#39;x&#39;"), "a & b <3 'x'");
        assert_eq!(decode_entities("salt & pepper"), "salt & pepper");
        assert_eq!(decode_entities("&unknown; &#xZZ;"), "&unknown; &#xZZ;");
    }
}
