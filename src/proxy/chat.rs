use crate::adapters::gemini::{generate_content_url, upstream_error_message, API_KEY_HEADER};
use crate::config::lambda::ProxyConfig;
use crate::proxy::{preflight, ProxyRequest, ProxyResponse};
use crate::utils::error::Result;
use crate::utils::validation::validate_required_field;
use reqwest::Client;
use serde_json::Value;

/// Forwards `generateContent` bodies to the generative-language API, adding the key.
pub struct ChatProxy {
    client: Client,
    config: ProxyConfig,
}

impl ChatProxy {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(config.timeout()).build()?,
            config,
        })
    }

    pub async fn handle(&self, request: &ProxyRequest) -> ProxyResponse {
        self.forward(request)
            .await
            .with_cors(&self.config.allowed_origin)
    }

    async fn forward(&self, request: &ProxyRequest) -> ProxyResponse {
        if let Some(response) = preflight(request) {
            return response;
        }

        let body = match request.json_body() {
            Ok(body) => body,
            Err(message) => return ProxyResponse::error(400, &message),
        };
        if !body.get("contents").is_some_and(Value::is_array) {
            return ProxyResponse::error(400, "Field 'contents' must be an array");
        }

        let api_key = match validate_required_field("GEMINI_API_KEY", &self.config.gemini_api_key) {
            Ok(key) => key,
            Err(e) => {
                tracing::error!("Chat proxy misconfigured: {}", e);
                return ProxyResponse::error(500, "Server configuration error");
            }
        };

        let url = generate_content_url(&self.config.gemini_api_base, &self.config.gemini_model);
        tracing::info!(model = %self.config.gemini_model, "Forwarding chat request");

        let response = match self
            .client
            .post(&url)
            .header(API_KEY_HEADER, api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // reqwest 錯誤訊息含 URL，不含金鑰
                tracing::error!("Chat upstream request failed: {}", e);
                return ProxyResponse::error(502, "Upstream request failed");
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!("Failed to read chat upstream body: {}", e);
                return ProxyResponse::error(502, "Upstream request failed");
            }
        };

        if !status.is_success() {
            let message = upstream_error_message(&text)
                .unwrap_or_else(|| "Upstream request failed".to_string());
            tracing::warn!(status = status.as_u16(), "Chat upstream error: {}", message);
            return ProxyResponse::error(status.as_u16(), &message);
        }

        tracing::debug!(status = status.as_u16(), "Chat upstream succeeded");
        ProxyResponse::raw_json(200, text)
    }
}
