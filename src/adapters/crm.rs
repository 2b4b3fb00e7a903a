use crate::adapters::gemini::upstream_error_message;
use crate::domain::model::Lead;
use crate::domain::ports::LeadSink;
use crate::utils::error::{MortgageError, Result};
use crate::utils::validation::validate_contact;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// 透過 lead proxy 送出潛在客戶
#[derive(Debug, Clone)]
pub struct HttpLeadSink {
    client: Client,
    endpoint: String,
}

impl HttpLeadSink {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint: endpoint.to_string(),
        })
    }
}

#[async_trait]
impl LeadSink for HttpLeadSink {
    async fn submit(&self, lead: &Lead) -> Result<()> {
        validate_contact(lead.email.as_deref(), lead.phone.as_deref())?;

        tracing::debug!("Submitting lead to {}", self.endpoint);
        let response = self.client.post(&self.endpoint).json(lead).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MortgageError::UpstreamError {
                status: status.as_u16(),
                message: upstream_error_message(&body)
                    .unwrap_or_else(|| "lead submission failed".to_string()),
            });
        }

        tracing::info!("Lead submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn lead() -> Lead {
        Lead {
            name: Some("Jana Nováková".to_string()),
            email: Some("jana@example.com".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_submit_posts_lead() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/lead")
                .json_body_partial(r#"{"email": "jana@example.com"}"#);
            then.status(200).json_body(serde_json::json!({"success": true}));
        });

        let sink = HttpLeadSink::new(&server.url("/lead"), Duration::from_secs(5)).unwrap();
        sink.submit(&lead()).await.unwrap();
        api_mock.assert();
    }

    #[tokio::test]
    async fn test_submit_without_contact_is_rejected_locally() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(POST).path("/lead");
            then.status(200);
        });

        let sink = HttpLeadSink::new(&server.url("/lead"), Duration::from_secs(5)).unwrap();
        let err = sink.submit(&Lead::default()).await.unwrap_err();
        assert!(matches!(err, MortgageError::ValidationError { .. }));

        let blank = Lead {
            email: Some("   ".to_string()),
            phone: Some(String::new()),
            ..lead()
        };
        let err = sink.submit(&blank).await.unwrap_err();
        assert!(matches!(err, MortgageError::ValidationError { .. }));
        api_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_masked_upstream_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/lead");
            then.status(502)
                .json_body(serde_json::json!({"error": "Lead submission failed"}));
        });

        let sink = HttpLeadSink::new(&server.url("/lead"), Duration::from_secs(5)).unwrap();
        let err = sink.submit(&lead()).await.unwrap_err();
        assert_eq!(err.http_status(), 502);
        assert!(err.to_string().contains("Lead submission failed"));
    }
}
