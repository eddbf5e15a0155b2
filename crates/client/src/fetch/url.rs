//! Target URL parsing.

/// Error type for target URL failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Parse the caller-supplied target into an absolute http(s) URL.
///
/// Surrounding whitespace is ignored and the fragment is dropped, since it is
/// never sent upstream. Relative or scheme-less input is rejected.
pub fn parse_target(input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(format!("{trimmed}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UrlError::InvalidUrl(format!("{trimmed}: missing host")));
    }

    parsed.set_fragment(None);
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        let url = parse_target("https://example.com/index.html?a=1").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert_eq!(url.path(), "/index.html");
        assert_eq!(url.query(), Some("a=1"));
    }

    #[test]
    fn test_parse_drops_fragment_and_whitespace() {
        let url = parse_target("  https://example.com/#top ").unwrap();
        assert_eq!(url.as_str(), "https://example.com/");
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert!(matches!(parse_target("example.com"), Err(UrlError::InvalidUrl(_))));
        assert!(matches!(parse_target("/local/path"), Err(UrlError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        assert!(matches!(parse_target("file:///etc/passwd"), Err(UrlError::UnsupportedScheme(s)) if s == "file"));
        assert!(matches!(parse_target("javascript:alert(1)"), Err(UrlError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(parse_target(""), Err(UrlError::Empty)));
        assert!(matches!(parse_target("   "), Err(UrlError::Empty)));
    }
}
