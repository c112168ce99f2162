use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, header};

use crate::error::FetchError;

/// Upstream feeds publish every few minutes; intermediaries may reuse a
/// response for this long.
const CACHE_CONTROL: &str = "max-age=300";

const MAX_ERROR_BODY: usize = 200;

pub fn client(user_agent: &str) -> anyhow::Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .build()
        .context("Failed to build HTTP client")
}

/// GET `url` and return the body, treating non-2xx as [`FetchError::Status`].
pub async fn get_text(http: &Client, url: &str, timeout: Duration) -> Result<String, FetchError> {
    log::debug!("GET {url}");

    let res = http
        .get(url)
        .header(header::CACHE_CONTROL, CACHE_CONTROL)
        .timeout(timeout)
        .send()
        .await?;

    let status = res.status();
    let body = res.text().await?;

    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status,
            body: truncate_body(&body),
        });
    }

    Ok(body)
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
