use anyhow::Context;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use mortgage_assistant::utils::logger;
use mortgage_assistant::utils::validation::Validate;
use mortgage_assistant::{ProxyConfig, ProxyRequest, ProxyResponse, ProxyRouter, Route};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Gateway-style event (API Gateway REST / Netlify functions).
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub http_method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl From<ProxyResponse> for Response {
    fn from(response: ProxyResponse) -> Self {
        Self {
            status_code: response.status,
            headers: response.headers,
            body: response.body,
        }
    }
}

async fn function_handler(
    router: &ProxyRouter,
    fallback_route: Option<&str>,
    event: LambdaEvent<Request>,
) -> Result<Response, Error> {
    let request = event.payload;
    tracing::info!(method = %request.http_method, path = %request.path, "Incoming proxy request");

    if request.is_base64_encoded {
        return Ok(router.reject(400, "Binary bodies are not supported").into());
    }

    let route = Route::resolve(&request.path, fallback_route);
    let proxy_request = ProxyRequest {
        method: request.http_method,
        headers: request.headers.unwrap_or_default(),
        body: request.body,
    };

    let response = router.dispatch(route, &proxy_request).await;
    tracing::info!(status = response.status, "Proxy request finished");
    Ok(response.into())
}

fn build_router() -> anyhow::Result<ProxyRouter> {
    let config = ProxyConfig::from_env().context("Failed to read proxy configuration")?;
    config.validate().context("Invalid proxy configuration")?;
    ProxyRouter::new(config).context("Failed to build upstream HTTP client")
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let router = Arc::new(build_router()?);
    let fallback_route = std::env::var("PROXY_KIND").ok();

    run(service_fn(move |event: LambdaEvent<Request>| {
        let router = Arc::clone(&router);
        let fallback_route = fallback_route.clone();
        async move { function_handler(&router, fallback_route.as_deref(), event).await }
    }))
    .await
}
