mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::Request;
use tracing::{debug, error};

use crate::error::{FetchError, truncate};

/// Executes `req` and returns the body text of a successful response.
///
/// # Errors
///
/// [`FetchError::Transport`] if the request could not be completed and
/// [`FetchError::Status`] (with the first 200 characters of the body) for a
/// non-success status.
pub async fn fetch_text<C: HttpClient>(client: &C, req: Request) -> Result<String, FetchError> {
    debug!(url = %req.url(), "Making request");

    let resp = client.execute(req).await?;
    let status = resp.status();
    debug!(status = status.as_u16(), headers = ?resp.headers(), "Response received");

    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        error!(status = status.as_u16(), body = truncate(&body, 500), "HTTP error response");
        return Err(FetchError::Status {
            status,
            body: truncate(&body, 200).to_string(),
        });
    }

    Ok(resp.text().await?)
}
