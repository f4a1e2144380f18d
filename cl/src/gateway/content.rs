//! Remote content fetching for plan generation
//!
//! Fetches documentation/code URLs, reduces pages to plain text, and
//! truncates to a prompt-friendly size.

use std::time::Duration;

use tracing::debug;

use super::GatewayError;
use crate::llm::LlmError;

/// Truncation limit for fetched page text
pub const MAX_FETCHED_CONTENT_CHARS: usize = 30_000;

/// Marker appended when fetched text was cut at the limit
const TRUNCATION_MARKER: &str = "\n[Content truncated due to length]";

/// Fetch a URL and reduce it to text suitable for prompting
///
/// HTML is converted to markdown; anything else is used as-is. Text
/// longer than [`MAX_FETCHED_CONTENT_CHARS`] is truncated with a marker.
pub async fn fetch_url_content(url: &str) -> Result<String, GatewayError> {
    debug!(%url, "fetch_url_content: called");
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(GatewayError::InvalidInput(
            "URL must start with http:// or https://".to_string(),
        ));
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("codeleap/0.1 (content fetch)")
        .build()
        .map_err(|e| GatewayError::Llm(LlmError::Network(e)))?;

    let response = client
        .get(url)
        .header("Accept", "text/plain, text/html, application/json, */*")
        .send()
        .await
        .map_err(|e| GatewayError::Llm(LlmError::Network(e)))?;

    let status = response.status();
    if !status.is_success() {
        debug!(%status, "fetch_url_content: HTTP error status");
        return Err(GatewayError::Llm(LlmError::Api {
            status: status.as_u16(),
            message: format!("fetching {url}"),
        }));
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = response
        .text()
        .await
        .map_err(|e| GatewayError::Llm(LlmError::Network(e)))?;

    debug!(%content_type, body_len = body.len(), "fetch_url_content: body read");

    let text = if content_type.contains("text/html") || content_type.contains("application/xhtml")
    {
        // Strip markup so only readable text reaches the prompt
        html2md::rewrite_html(&body, false)
    } else {
        body
    };

    Ok(truncate_with_marker(text))
}

/// Cut text at the content limit, appending the truncation marker
fn truncate_with_marker(text: String) -> String {
    if text.chars().count() <= MAX_FETCHED_CONTENT_CHARS {
        return text;
    }
    let truncated: String = text.chars().take(MAX_FETCHED_CONTENT_CHARS).collect();
    format!("{truncated}{TRUNCATION_MARKER}")
}
