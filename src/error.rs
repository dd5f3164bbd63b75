use reqwest::StatusCode;
use thiserror::Error;

/// Why a provider request yielded no usable data.
///
/// None of these reach callers of the service; they select the next fallback
/// step and end up in the logs.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP error! Status: {status}, Response: {body}")]
    Status { status: StatusCode, body: String },

    #[error("API returned HTML instead of JSON - possible CORS or redirect issue")]
    Markup,

    #[error("failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unexpected response shape: {0}")]
    Shape(&'static str),
}

/// Truncates `text` to at most `max` characters for log output.
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
