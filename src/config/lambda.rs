use crate::adapters::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::utils::error::{MortgageError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url, Validate,
};
use std::env;
use std::time::Duration;

pub const DEFAULT_LEAD_SOURCE: &str = "mortgage-calculator";

/// Serverless proxy settings, read from the function's environment.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub crm_endpoint: Option<String>,
    pub crm_api_token: Option<String>,
    pub allowed_origin: String,
    pub upstream_timeout_secs: u64,
    pub lead_source: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_api_base: DEFAULT_API_BASE.to_string(),
            crm_endpoint: None,
            crm_api_token: None,
            allowed_origin: "*".to_string(),
            upstream_timeout_secs: 30,
            lead_source: DEFAULT_LEAD_SOURCE.to_string(),
        }
    }
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 缺少的金鑰不在此報錯，由各 proxy 在請求時回 500
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let upstream_timeout_secs = match non_empty("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| MortgageError::InvalidConfigValueError {
                    field: "UPSTREAM_TIMEOUT_SECS".to_string(),
                    value: raw.clone(),
                    reason: "Expected a whole number of seconds".to_string(),
                })?,
            None => defaults.upstream_timeout_secs,
        };

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY"),
            gemini_model: non_empty("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_api_base: non_empty("GEMINI_API_BASE").unwrap_or(defaults.gemini_api_base),
            crm_endpoint: non_empty("CRM_ENDPOINT"),
            crm_api_token: non_empty("CRM_API_TOKEN"),
            allowed_origin: non_empty("ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            upstream_timeout_secs,
            lead_source: non_empty("LEAD_SOURCE").unwrap_or(defaults.lead_source),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

impl Validate for ProxyConfig {
    fn validate(&self) -> Result<()> {
        validate_url("GEMINI_API_BASE", &self.gemini_api_base)?;
        validate_non_empty_string("GEMINI_MODEL", &self.gemini_model)?;

        if let Some(endpoint) = &self.crm_endpoint {
            validate_url("CRM_ENDPOINT", endpoint)?;
        }

        validate_non_empty_string("ALLOWED_ORIGIN", &self.allowed_origin)?;
        validate_positive_number("UPSTREAM_TIMEOUT_SECS", self.upstream_timeout_secs as usize, 1)?;
        validate_range("UPSTREAM_TIMEOUT_SECS", self.upstream_timeout_secs, 1, 300)?;

        if self.gemini_api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set, chat requests will fail");
        }
        if self.crm_endpoint.is_none() {
            tracing::warn!("CRM_ENDPOINT is not set, lead submissions will fail");
        }

        tracing::info!("✅ Proxy configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_empty() {
        let config = ProxyConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.gemini_model, DEFAULT_MODEL);
        assert_eq!(config.allowed_origin, "*");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.gemini_api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_values_from_environment() {
        let config = ProxyConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "key-123"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("CRM_ENDPOINT", "https://crm.example.com/leads"),
            ("ALLOWED_ORIGIN", "https://hypoteky.example.cz"),
            ("UPSTREAM_TIMEOUT_SECS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.gemini_api_key.as_deref(), Some("key-123"));
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.upstream_timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let config = ProxyConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  ")])).unwrap();
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ProxyConfig::from_lookup(lookup(&[("UPSTREAM_TIMEOUT_SECS", "soon")])).is_err());

        let config = ProxyConfig::from_lookup(lookup(&[("CRM_ENDPOINT", "not a url")])).unwrap();
        assert!(config.validate().is_err());

        let config = ProxyConfig::from_lookup(lookup(&[("UPSTREAM_TIMEOUT_SECS", "0")])).unwrap();
        assert!(config.validate().is_err());
    }
}
