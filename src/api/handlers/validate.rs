//! Field checks for request bodies.
//!
//! Each check records a [`FieldError`] and hands back the cleaned value, so a
//! handler can run every check and report all failures at once.

use regex::Regex;
use url::Url;

use super::error::{ApiError, FieldError};

const SCHEME_PATTERN: &str = r"^[a-zA-Z][a-zA-Z0-9+.-]*://";

/// Prefix `https://` when the value carries no scheme of its own.
pub(crate) fn normalize_http_url(raw: &str) -> String {
    let value = raw.trim();
    if value.is_empty() {
        return String::new();
    }
    if Regex::new(SCHEME_PATTERN).is_ok_and(|regex| regex.is_match(value)) {
        value.to_string()
    } else {
        format!("https://{value}")
    }
}

pub(crate) fn parse_http_url(value: &str) -> Option<Url> {
    Url::parse(value)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
}

/// Empty, a `data:image/...` URI or an http(s) URL.
pub(crate) fn is_image_ref(value: &str) -> bool {
    if value.is_empty() {
        return true;
    }
    if value.starts_with("data:") {
        return value.starts_with("data:image/");
    }
    parse_http_url(value).is_some()
}

#[derive(Debug, Default)]
pub(crate) struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Patches must change at least one field.
    pub(crate) fn non_empty_patch(&mut self, empty: bool) {
        if empty {
            self.errors.push(FieldError {
                path: Vec::new(),
                message: "Empty patch".to_string(),
            });
        }
    }

    /// Trimmed text of `min..=max` characters.
    pub(crate) fn text(&mut self, field: &str, value: &str, min: usize, max: usize) -> String {
        let value = value.trim();
        let len = value.chars().count();
        if len < min {
            self.reject(field, format!("Must contain at least {min} character(s)"));
        } else if len > max {
            self.reject(field, format!("Must contain at most {max} character(s)"));
        }
        value.to_string()
    }

    pub(crate) fn optional_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        min: usize,
        max: usize,
    ) -> Option<String> {
        value.map(|value| self.text(field, value, min, max))
    }

    /// Non-blank identifier, returned as given.
    pub(crate) fn id(&mut self, field: &str, value: &str) -> String {
        if value.is_empty() {
            self.reject(field, "Must not be empty");
        }
        value.to_string()
    }

    pub(crate) fn order(&mut self, field: &str, value: i64) -> i64 {
        if value < 0 {
            self.reject(field, "Must be greater than or equal to 0");
        }
        value
    }

    /// Required http(s) URL, normalized.
    pub(crate) fn http_url(&mut self, field: &str, value: &str) -> String {
        let url = normalize_http_url(value);
        if url.is_empty() {
            self.reject(field, "Must contain at least 1 character(s)");
        } else if parse_http_url(&url).is_none() {
            self.reject(field, "URL must be http/https");
        }
        url
    }

    /// Optional icon URL; empty stays empty.
    pub(crate) fn icon_url(&mut self, field: &str, value: &str) -> String {
        let value = value.trim();
        if value.chars().count() > 512 {
            self.reject(field, "Must contain at most 512 character(s)");
            return value.to_string();
        }
        let url = normalize_http_url(value);
        if !url.is_empty() && parse_http_url(&url).is_none() {
            self.reject(field, "Icon URL must be http/https");
        }
        url
    }

    pub(crate) fn image_ref(&mut self, field: &str, value: &str) {
        if !is_image_ref(value) {
            self.reject(field, "Must be a data:image URI or an http/https URL");
        }
    }

    /// # Errors
    /// Returns [`ApiError::Validation`] listing every recorded failure.
    pub(crate) fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_prefixed_only_when_missing() {
        assert_eq!(normalize_http_url(" example.com "), "https://example.com");
        assert_eq!(normalize_http_url("http://a.dev/x"), "http://a.dev/x");
        assert_eq!(normalize_http_url("ftp://files.dev"), "ftp://files.dev");
        assert_eq!(normalize_http_url("   "), "");
    }

    #[test]
    fn http_url_rejects_other_schemes() {
        let mut v = Validator::new();
        assert_eq!(v.http_url("url", "example.com"), "https://example.com");
        v.http_url("url", "ftp://files.dev");
        v.http_url("url", "  ");
        match v.finish() {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].path, vec!["url".to_string()]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn text_counts_characters_after_trimming() {
        let mut v = Validator::new();
        assert_eq!(v.text("name", "  ok  ", 1, 2), "ok");
        v.text("name", "ééé", 1, 3);
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        v.text("name", "   ", 1, 64);
        v.text("name", &"x".repeat(65), 1, 64);
        assert!(matches!(v.finish(), Err(ApiError::Validation(errors)) if errors.len() == 2));
    }

    #[test]
    fn image_refs() {
        assert!(is_image_ref(""));
        assert!(is_image_ref("data:image/png;base64,AAAA"));
        assert!(is_image_ref("https://example.com/i.png"));
        assert!(!is_image_ref("data:text/html,<b>"));
        assert!(!is_image_ref("javascript:alert(1)"));
        assert!(!is_image_ref("not a url"));
    }

    #[test]
    fn icon_url_allows_empty() {
        let mut v = Validator::new();
        assert_eq!(v.icon_url("icon", ""), "");
        assert_eq!(v.icon_url("icon", "cdn.dev/i.png"), "https://cdn.dev/i.png");
        assert!(v.finish().is_ok());
    }
}
