//! Recipe extraction with Google's Gemini API
//!
//! The prompt is a fixed task description followed by few-shot examples and
//! the caption. Gemini is asked for JSON output, which is parsed into
//! [`Extraction`] items.

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{Extraction, RecipeExtractor};
use crate::error::{AppError, AppResult};

const PROMPT: &str = include_str!("../../../prompts/recipe_prompt.txt");
const EXAMPLES: &str = include_str!("../../../prompts/recipe_examples.json");

#[derive(Debug, Deserialize)]
struct Example {
    text: String,
    extractions: Vec<Extraction>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ExtractionOutput {
    #[serde(default)]
    extractions: Vec<Extraction>,
}

#[derive(Clone)]
pub struct GeminiExtractor {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    examples: String,
}

impl GeminiExtractor {
    pub fn new(
        http_client: HttpClient,
        api_key: String,
        api_url: String,
        model: String,
    ) -> AppResult<Self> {
        let examples = render_examples(EXAMPLES)?;
        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
            examples,
        })
    }

    fn prompt(&self, text: &str) -> String {
        format!(
            "{}\n{}\nText:\n{}\nOutput:\n",
            PROMPT.trim_end(),
            self.examples,
            text
        )
    }
}

/// Formats the bundled examples as input/output pairs for the prompt
fn render_examples(raw: &str) -> AppResult<String> {
    let examples: Vec<Example> = serde_json::from_str(raw)
        .map_err(|e| AppError::Internal(format!("Invalid extraction examples: {}", e)))?;

    let mut rendered = String::new();
    for example in examples {
        let output = json!({ "extractions": example.extractions });
        rendered.push_str(&format!(
            "\nText:\n{}\nOutput:\n{}\n",
            example.text, output
        ));
    }
    Ok(rendered)
}

/// Removes a surrounding Markdown code fence, if any
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Reads the extractions out of a generateContent response body
fn parse_response(body: GenerateResponse) -> AppResult<Vec<Extraction>> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AppError::Extraction(
            "Extraction model returned no output".to_string(),
        ));
    }

    let json = strip_code_fence(&text);
    let output = match serde_json::from_str::<Value>(json) {
        // Bare list of extractions
        Ok(list @ Value::Array(_)) => ExtractionOutput {
            extractions: serde_json::from_value(list).map_err(malformed)?,
        },
        Ok(object) => serde_json::from_value(object).map_err(malformed)?,
        Err(e) => return Err(malformed(e)),
    };

    Ok(output.extractions)
}

fn malformed(e: serde_json::Error) -> AppError {
    AppError::Extraction(format!("Extraction model returned malformed output: {}", e))
}

#[async_trait::async_trait]
impl RecipeExtractor for GeminiExtractor {
    async fn extract(&self, text: &str) -> AppResult<Vec<Extraction>> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url, self.model
        );

        let request = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": self.prompt(text) }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.0
            }
        });

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Gemini API returned status {}: {}",
                status, body
            )));
        }

        let body: GenerateResponse = response.json().await?;
        let extractions = parse_response(body)?;

        tracing::info!(
            extractor = self.name(),
            model = %self.model,
            caption_len = text.len(),
            extraction_count = extractions.len(),
            "Extracted recipe from caption"
        );

        Ok(extractions)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
