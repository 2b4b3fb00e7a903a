use crate::utils::error::{MortgageError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(MortgageError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(MortgageError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(MortgageError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(MortgageError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| MortgageError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(MortgageError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(MortgageError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_unique<'a>(field_name: &str, values: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(value) {
            return Err(MortgageError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: value.to_string(),
                reason: "Duplicate value".to_string(),
            });
        }
    }
    Ok(())
}

/// 使用者輸入的金額：必須是有限且非負的數字
pub fn validate_amount(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(MortgageError::validation(field_name, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(MortgageError::validation(field_name, "must not be negative"));
    }
    Ok(())
}

/// A lead is reachable when email or phone holds more than whitespace.
pub fn has_contact(email: Option<&str>, phone: Option<&str>) -> bool {
    [email, phone]
        .into_iter()
        .flatten()
        .any(|value| !value.trim().is_empty())
}

pub fn validate_contact(email: Option<&str>, phone: Option<&str>) -> Result<()> {
    if !has_contact(email, phone) {
        return Err(MortgageError::validation("lead", "email or phone is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("crm_endpoint", "https://example.com").is_ok());
        assert!(validate_url("crm_endpoint", "http://example.com").is_ok());
        assert!(validate_url("crm_endpoint", "").is_err());
        assert!(validate_url("crm_endpoint", "invalid-url").is_err());
        assert!(validate_url("crm_endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount("property_value", 0.0).is_ok());
        assert!(validate_amount("property_value", 5_000_000.0).is_ok());
        assert!(validate_amount("property_value", -1.0).is_err());
        assert!(validate_amount("property_value", f64::NAN).is_err());
        assert!(validate_amount("property_value", f64::INFINITY).is_err());
    }

    #[test]
    fn test_contact_must_not_be_blank() {
        assert!(has_contact(Some("a@b.cz"), None));
        assert!(has_contact(Some(" "), Some("+420 777 000 111")));
        assert!(!has_contact(Some(""), None));
        assert!(!has_contact(Some("   "), Some("\t")));
        assert!(validate_contact(None, None).is_err());
    }

    #[test]
    fn test_validate_unique() {
        assert!(validate_unique("banks.id", ["a", "b"]).is_ok());
        assert!(validate_unique("banks.id", ["a", "b", "a"]).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("term_years", 30, 5, 30).is_ok());
        assert!(validate_range("term_years", 31, 5, 30).is_err());
    }
}
