use crate::utils::error::{IntakeError, Result};
use std::fmt::Display;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl Display, reason: impl Into<String>) -> IntakeError {
    IntakeError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// The intake service must be reachable over plain HTTP(S).
pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.trim().is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }
    let url = Url::parse(url_str).map_err(|e| invalid(field_name, url_str, format!("Invalid URL format: {}", e)))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(invalid(field_name, url_str, format!("Unsupported URL scheme: {}", scheme))),
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(field_name, url_str, "Service URL cannot carry a query or fragment"));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field_name, value, "Value cannot be empty or whitespace-only"));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + Display + Copy>(field_name: &str, value: T, min: T, max: T) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(field_name, value, format!("Value must be between {} and {}", min, max)));
    }
    Ok(())
}

/// BCP-47 style tag: a 2-3 letter language code with an optional region,
/// e.g. `hi` or `en-IN`. Whether the language is offered is checked elsewhere.
pub fn validate_language_tag(field_name: &str, tag: &str) -> Result<()> {
    let mut parts = tag.split(['-', '_']);
    let language = parts.next().unwrap_or_default();
    let region = parts.next();

    let language_ok = (2..=3).contains(&language.len()) && language.chars().all(|c| c.is_ascii_alphabetic());
    let region_ok = region
        .map(|r| (2..=3).contains(&r.len()) && r.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(true);
    if !language_ok || !region_ok || parts.next().is_some() {
        return Err(invalid(field_name, tag, "Expected a language code such as 'hi' or 'en-IN'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("service.base_url", "https://intake.example.in").is_ok());
        assert!(validate_url("service.base_url", "http://localhost:8000/intake").is_ok());
        assert!(validate_url("service.base_url", "").is_err());
        assert!(validate_url("service.base_url", "invalid-url").is_err());
        assert!(validate_url("service.base_url", "ftp://example.com").is_err());
        assert!(validate_url("service.base_url", "http://localhost:8000/?debug=1").is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("matching.placeholder_requirement", "materials").is_ok());
        assert!(validate_non_empty_string("matching.placeholder_requirement", "   ").is_err());
    }

    #[test]
    fn test_validate_range_reports_bounds() {
        assert!(validate_range("service.timeout_seconds", 30u64, 1, 300).is_ok());
        let err = validate_range("categorization.min_description_chars", 0usize, 1, 500).unwrap_err();
        assert!(err.to_string().contains("between 1 and 500"));
    }

    #[test]
    fn test_validate_language_tag() {
        assert!(validate_language_tag("language", "hi").is_ok());
        assert!(validate_language_tag("language", "en-IN").is_ok());
        assert!(validate_language_tag("language", "mni").is_ok());
        assert!(validate_language_tag("language", "").is_err());
        assert!(validate_language_tag("language", "hindi").is_err());
        assert!(validate_language_tag("language", "en-IN-x").is_err());
    }
}
