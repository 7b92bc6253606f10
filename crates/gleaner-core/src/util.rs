use url::Url;

use crate::error::AppError;

/// Normalize a user-supplied URL string into an absolute http(s) URL.
///
/// Strings without a scheme separator are treated as bare hosts and get
/// `https://` prepended. Anything that still fails to parse, has no host,
/// or uses a scheme other than http/https is rejected.
///
/// Example: `"example.com/about"` → `"https://example.com/about"`
pub fn normalize_url(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput("URL is blank".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| AppError::InvalidInput(format!("Invalid URL '{trimmed}': {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(AppError::InvalidInput(format!(
                "URL scheme '{scheme}' is not allowed (only http/https): {trimmed}"
            )));
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AppError::InvalidInput(format!("URL has no host: {trimmed}")));
    }

    Ok(parsed.to_string())
}
