use crate::config::lambda::ProxyConfig;
use crate::proxy::{preflight, ProxyRequest, ProxyResponse};
use crate::utils::error::Result;
use crate::utils::validation::{self, validate_required_field};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::{Map, Value};

const MASKED_ERROR: &str = "Lead submission failed";

/// Forwards lead submissions to the CRM ingestion endpoint.
///
/// Upstream failures are never relayed: the client always sees a 502 with a
/// generic message and the details go to the log.
pub struct LeadProxy {
    client: Client,
    config: ProxyConfig,
}

impl LeadProxy {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(config.timeout()).build()?,
            config,
        })
    }

    pub async fn handle(&self, request: &ProxyRequest) -> ProxyResponse {
        self.forward(request, Utc::now())
            .await
            .with_cors(&self.config.allowed_origin)
    }

    async fn forward(&self, request: &ProxyRequest, now: DateTime<Utc>) -> ProxyResponse {
        if let Some(response) = preflight(request) {
            return response;
        }

        let mut lead = match request.json_body() {
            Ok(Value::Object(map)) => map,
            Ok(_) => return ProxyResponse::error(400, "Lead must be a JSON object"),
            Err(message) => return ProxyResponse::error(400, &message),
        };
        if !has_contact(&lead) {
            return ProxyResponse::error(400, "Email or phone is required");
        }

        let endpoint = match validate_required_field("CRM_ENDPOINT", &self.config.crm_endpoint) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::error!("Lead proxy misconfigured: {}", e);
                return ProxyResponse::error(500, "Server configuration error");
            }
        };

        lead.entry("source")
            .or_insert_with(|| Value::String(self.config.lead_source.clone()));
        lead.insert("submitted_at".to_string(), Value::String(now.to_rfc3339()));

        let mut builder = self.client.post(endpoint).json(&lead);
        if let Some(token) = &self.config.crm_api_token {
            builder = builder.bearer_auth(token);
        }

        match builder.send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!(status = response.status().as_u16(), "Lead forwarded to CRM");
                ProxyResponse::json(200, &serde_json::json!({ "success": true }))
            }
            Ok(response) => {
                let status = response.status();
                let detail = response.text().await.unwrap_or_default();
                tracing::error!(status = status.as_u16(), "CRM rejected lead: {}", detail);
                ProxyResponse::error(502, MASKED_ERROR)
            }
            Err(e) => {
                tracing::error!("CRM request failed: {}", e);
                ProxyResponse::error(502, MASKED_ERROR)
            }
        }
    }
}

fn has_contact(lead: &Map<String, Value>) -> bool {
    validation::has_contact(
        lead.get("email").and_then(Value::as_str),
        lead.get("phone").and_then(Value::as_str),
    )
}
