//! URL 验证模块
//!
//! 在任何后端访问之前拒绝空的或格式错误的原始 URL。

use url::Url;

use crate::errors::ShortstatError;

/// URL 验证错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    UnsupportedScheme(String),
    MissingHost,
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::UnsupportedScheme(scheme) => write!(
                f,
                "Unsupported scheme: {}. Only http and https are allowed",
                scheme
            ),
            Self::MissingHost => write!(f, "URL has no host"),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

impl From<UrlValidationError> for ShortstatError {
    fn from(err: UrlValidationError) -> Self {
        ShortstatError::invalid_input(err.to_string())
    }
}

/// 验证原始 URL 并返回去除首尾空白后的形式
///
/// 检查项目：
/// 1. URL 不为空
/// 2. 格式可被解析
/// 3. 必须是 http 或 https（同时挡掉 javascript:, data:, file: 等）
/// 4. 必须带有主机名
///
/// The returned string is the trimmed input, not the parser's normalized
/// form, so the content hash stays tied to what the caller sent.
pub fn validate_url(url: &str) -> Result<&str, UrlValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let parsed = Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::UnsupportedScheme(other.to_string())),
    }

    if parsed.host_str().is_none_or(|h| h.is_empty()) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert_eq!(validate_url("http://example.com"), Ok("http://example.com"));
        assert!(validate_url("https://example.com/path?query=1").is_ok());
        assert!(validate_url("http://localhost:8080").is_ok());
        assert!(validate_url("HTTPS://EXAMPLE.COM").is_ok());
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(
            validate_url("  https://example.com/  "),
            Ok("https://example.com/")
        );
    }

    #[test]
    fn test_dangerous_schemes() {
        assert!(matches!(
            validate_url("javascript:alert(1)"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(UrlValidationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_empty_url() {
        assert_eq!(validate_url(""), Err(UrlValidationError::EmptyUrl));
        assert_eq!(validate_url("   "), Err(UrlValidationError::EmptyUrl));
    }

    #[test]
    fn test_malformed_url() {
        assert!(matches!(
            validate_url("not a url"),
            Err(UrlValidationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_converts_to_invalid_input() {
        let err: ShortstatError = UrlValidationError::EmptyUrl.into();
        assert!(matches!(err, ShortstatError::InvalidInput(_)));
    }
}
