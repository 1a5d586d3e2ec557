//! HTTP completion providers.
//!
//! Implements [`CompletionProvider`] for:
//! - **[`GeminiProvider`]**: `POST /v1beta/models/{model}:generateContent`
//! - **[`OpenAIProvider`]**: `POST /v1/chat/completions`
//!
//! # Provider Selection
//!
//! Use [`create_provider`] to build the configured provider. It returns
//! `None` when the provider is `"disabled"` or the API key variable is not
//! set, which the resolver treats as "LLM not configured".
//!
//! # Failure Policy
//!
//! Requests are bounded by `llm.timeout_secs`. There are no retries: a
//! failed call is reported once and the resolver decides whether a
//! heuristic fallback applies.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use grant_tagger_core::completion::CompletionProvider;

use crate::config::LlmConfig;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

fn http_client(config: &LlmConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

fn api_root(config: &LlmConfig, default: &str) -> String {
    config
        .base_url
        .as_deref()
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// Turn a non-success response into an error carrying status and body.
async fn ensure_success(provider: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body_text = response.text().await.unwrap_or_default();
    bail!("{} API error {}: {}", provider, status, body_text);
}

// ============ Gemini ============

/// Google Gemini `generateContent` client.
pub struct GeminiProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        let model = config.model_name().to_string();
        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            api_root(config, GEMINI_BASE_URL),
            model
        );
        Ok(Self {
            client: http_client(config)?,
            endpoint,
            model,
            api_key,
        })
    }
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

/// Concatenate the text parts of the first candidate.
fn gemini_text(resp: GeminiResponse) -> Result<String> {
    let content = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| anyhow!("Invalid Gemini response: no candidates"))?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    Ok(text)
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": { "temperature": 0.0 },
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let response = ensure_success("Gemini", response).await?;
        gemini_text(response.json().await?)
    }
}

// ============ OpenAI ============

/// OpenAI-compatible chat completions client.
pub struct OpenAIProvider {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAIProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self> {
        Ok(Self {
            client: http_client(config)?,
            endpoint: format!("{}/v1/chat/completions", api_root(config, OPENAI_BASE_URL)),
            model: config.model_name().to_string(),
            api_key,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

fn chat_text(resp: ChatResponse) -> Result<String> {
    resp.choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| anyhow!("Invalid OpenAI response: no choices"))
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": 0,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;
        let response = ensure_success("OpenAI", response).await?;
        chat_text(response.json().await?)
    }
}

/// Build the configured provider.
///
/// | `llm.provider` | key set | result |
/// |----------------|---------|--------|
/// | `"disabled"` | any | `None` |
/// | `"gemini"` / `"openai"` | no | `None` (warning logged) |
/// | `"gemini"` | yes | [`GeminiProvider`] |
/// | `"openai"` | yes | [`OpenAIProvider`] |
pub fn create_provider(config: &LlmConfig) -> Result<Option<Arc<dyn CompletionProvider>>> {
    if !config.is_enabled() {
        info!("LLM provider disabled; heuristic tagging only");
        return Ok(None);
    }

    let api_key = match config.api_key() {
        Some(key) => key,
        None => {
            warn!(
                provider = %config.provider,
                env = config.key_env(),
                "API key is not set; falling back to heuristic tags"
            );
            return Ok(None);
        }
    };

    let provider: Arc<dyn CompletionProvider> = match config.provider.as_str() {
        "gemini" => Arc::new(GeminiProvider::new(config, api_key)?),
        "openai" => Arc::new(OpenAIProvider::new(config, api_key)?),
        other => bail!("Unknown llm provider: {}", other),
    };
    info!(provider = %config.provider, model = provider.model_name(), "LLM tagging enabled");
    Ok(Some(provider))
}
