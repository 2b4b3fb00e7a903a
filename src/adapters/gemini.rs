use crate::domain::model::{ChatMessage, ChatRole};
use crate::domain::ports::ChatBackend;
use crate::utils::error::{MortgageError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_output_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    pub fn new(system_instruction: &str, history: &[ChatMessage], config: &GenerationConfig) -> Self {
        let contents = history
            .iter()
            .map(|message| Content {
                role: Some(
                    match message.role {
                        ChatRole::User => "user",
                        ChatRole::Model => "model",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: message.text.clone(),
                }],
            })
            .collect();

        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            },
            contents,
            generation_config: config.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// 第一個候選回覆的所有文字片段
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Pulls a human-readable message out of an upstream error body.
///
/// Understands `{"error": {"message": ...}}` and `{"error": "..."}`.
pub fn upstream_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let error = value.get("error")?;
    error
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| error.as_str())
        .map(str::to_string)
}

/// `ChatBackend` over the generative-language `generateContent` endpoint,
/// called either directly with an API key or through the chat proxy.
#[derive(Debug, Clone)]
pub struct GenerativeChatBackend {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    generation: GenerationConfig,
}

impl GenerativeChatBackend {
    pub fn direct(base: &str, model: &str, api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: generate_content_url(base, model),
            api_key: Some(api_key),
            generation: GenerationConfig::default(),
        })
    }

    pub fn via_proxy(proxy_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: proxy_url.to_string(),
            api_key: None,
            generation: GenerationConfig::default(),
        })
    }

    pub fn with_generation_config(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }
}

pub fn generate_content_url(base: &str, model: &str) -> String {
    format!("{}/models/{}:generateContent", base.trim_end_matches('/'), model)
}

#[async_trait]
impl ChatBackend for GenerativeChatBackend {
    async fn generate(&self, system_instruction: &str, history: &[ChatMessage]) -> Result<String> {
        let request = GenerateContentRequest::new(system_instruction, history, &self.generation);

        tracing::debug!(
            "Sending {} messages to generative endpoint",
            request.contents.len()
        );
        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        let response = builder.send().await?;

        let status = response.status();
        tracing::debug!("Generative endpoint status: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MortgageError::UpstreamError {
                status: status.as_u16(),
                message: upstream_error_message(&body)
                    .unwrap_or_else(|| "generative request failed".to_string()),
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;
        parsed.text().ok_or_else(|| MortgageError::AssistantError {
            message: "model returned no text".to_string(),
        })
    }
}
