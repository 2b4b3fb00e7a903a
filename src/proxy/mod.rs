//! Serverless proxies: method check, body check, forward, relay or mask errors.
//!
//! Handlers work on plain [`ProxyRequest`]/[`ProxyResponse`] values so the
//! same code runs behind any gateway adapter and in tests.

pub mod chat;
pub mod lead;

use crate::config::lambda::ProxyConfig;
use crate::utils::error::Result;
use serde_json::Value;
use std::collections::BTreeMap;

pub use chat::ChatProxy;
pub use lead::LeadProxy;

#[derive(Debug, Clone, Default)]
pub struct ProxyRequest {
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
}

impl ProxyRequest {
    pub fn post(body: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            headers: BTreeMap::new(),
            body: Some(body.into()),
        }
    }

    pub fn with_method(method: &str) -> Self {
        Self {
            method: method.to_string(),
            ..Default::default()
        }
    }

    /// 解析 JSON body；空 body 或格式錯誤時回傳說明文字
    pub(crate) fn json_body(&self) -> std::result::Result<Value, String> {
        let body = self
            .body
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| "Request body is required".to_string())?;
        serde_json::from_str(body).map_err(|e| format!("Invalid JSON body: {}", e))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl ProxyResponse {
    pub fn json(status: u16, value: &Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status,
            headers,
            body: value.to_string(),
        }
    }

    pub fn raw_json(status: u16, body: String) -> Self {
        let mut response = Self::json(status, &Value::Null);
        response.body = body;
        response
    }

    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    pub fn method_not_allowed() -> Self {
        let mut response = Self::error(405, "Method Not Allowed");
        response
            .headers
            .insert("Allow".to_string(), "POST, OPTIONS".to_string());
        response
    }

    pub fn with_cors(mut self, origin: &str) -> Self {
        self.headers
            .insert("Access-Control-Allow-Origin".to_string(), origin.to_string());
        self.headers.insert(
            "Access-Control-Allow-Methods".to_string(),
            "POST, OPTIONS".to_string(),
        );
        self.headers.insert(
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type".to_string(),
        );
        self
    }

    pub fn json_value(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

/// 依方法做共同的前置判斷，回傳 None 表示可以繼續處理 POST
pub(crate) fn preflight(request: &ProxyRequest) -> Option<ProxyResponse> {
    match request.method.to_ascii_uppercase().as_str() {
        "POST" => None,
        "OPTIONS" => Some(ProxyResponse::no_content()),
        other => {
            tracing::warn!("Rejected {} request", other);
            Some(ProxyResponse::method_not_allowed())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Chat,
    Lead,
}

impl Route {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "chat" | "gemini" => Some(Route::Chat),
            "lead" | "crm" => Some(Route::Lead),
            _ => None,
        }
    }

    /// Route from the last path segment, falling back to a configured kind.
    pub fn resolve(path: &str, fallback: Option<&str>) -> Option<Self> {
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .and_then(Self::parse)
            .or_else(|| fallback.and_then(Self::parse))
    }
}

pub struct ProxyRouter {
    chat: ChatProxy,
    lead: LeadProxy,
    allowed_origin: String,
}

impl ProxyRouter {
    pub fn new(config: ProxyConfig) -> Result<Self> {
        Ok(Self {
            allowed_origin: config.allowed_origin.clone(),
            chat: ChatProxy::new(config.clone())?,
            lead: LeadProxy::new(config)?,
        })
    }

    /// Error answered before any handler runs, with the same CORS headers.
    pub fn reject(&self, status: u16, message: &str) -> ProxyResponse {
        ProxyResponse::error(status, message).with_cors(&self.allowed_origin)
    }

    pub async fn dispatch(&self, route: Option<Route>, request: &ProxyRequest) -> ProxyResponse {
        match route {
            Some(Route::Chat) => self.chat.handle(request).await,
            Some(Route::Lead) => self.lead.handle(request).await,
            None => self.reject(404, "Not Found"),
        }
    }
}
