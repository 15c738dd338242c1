//! HTTP retry helpers for transient errors.
//!
//! Reads and procedure calls go through [`send_json`] so that timeouts,
//! connection resets, rate limiting, and server errors are retried with
//! exponential backoff. Inserts go through [`send_json_once`] and are never
//! resent. Client errors are permanent and are classified from the response
//! body.

use std::time::Duration;

use crate::StoreError;

/// Maximum number of retry attempts for transient failures.
///
/// With exponential backoff (1s, 2s, 4s) the total wait before giving up
/// is 7 seconds.
const MAX_RETRIES: u32 = 3;

/// Maximum number of full re-fetch attempts when the response body cannot
/// be read.
const MAX_BODY_RETRIES: u32 = 2;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// Sends a request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt, since builders
/// are consumed by `.send()`.
///
/// # Errors
///
/// Returns [`StoreError`] if the request fails after all retries, the store
/// rejects it, or the body is not valid JSON.
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, StoreError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    send_json_with(&build_request, MAX_RETRIES, MAX_BODY_RETRIES).await
}

/// Sends a non-idempotent request exactly once and parses the response
/// body as JSON. Transient failures are returned to the caller.
///
/// # Errors
///
/// Returns [`StoreError`] if the request fails, the store rejects it, or
/// the body is not valid JSON.
pub async fn send_json_once<F>(build_request: F) -> Result<serde_json::Value, StoreError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    send_json_with(&build_request, 0, 0).await
}

async fn send_json_with<F>(
    build_request: &F,
    max_retries: u32,
    max_body_retries: u32,
) -> Result<serde_json::Value, StoreError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut body_attempt = 0;
    loop {
        let response = send_inner(build_request, max_retries).await?;
        let url = response.url().to_string();
        let status = response.status();

        match response.text().await {
            Ok(text) if text.trim().is_empty() => return Ok(serde_json::Value::Null),
            Ok(text) => {
                return serde_json::from_str(&text).map_err(|e| {
                    log::error!(
                        "JSON parse failed\n  url: {url}\n  status: {status}\n  \
                         parse error: {e}\n  body preview: {}",
                        preview(&text),
                    );
                    StoreError::Json(e)
                });
            }
            Err(e) if body_attempt < max_body_retries => {
                let delay = Duration::from_secs(1u64 << body_attempt);
                body_attempt += 1;
                log::warn!(
                    "Response body read failed (body retry {body_attempt}/{max_body_retries}), \
                     re-fetching in {delay:?}...\n  url: {url}\n  error: {e}",
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                log::error!("Response body read failed after {body_attempt} retries: {e}");
                return Err(StoreError::Http(e));
            }
        }
    }
}

/// Core retry loop. Returns the response once it has a 2xx or 3xx status.
async fn send_inner<F>(build_request: &F, max_retries: u32) -> Result<reqwest::Response, StoreError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut last_error: Option<StoreError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1u64 << (attempt - 1));
            log::warn!("  retry {attempt}/{max_retries} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < max_retries {
                    log::warn!("  transient error: {e}");
                    last_error = Some(StoreError::Http(e));
                    continue;
                }
                return Err(StoreError::Http(e));
            }
            Ok(response) => {
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                    let body = response.text().await.unwrap_or_default();
                    let error = StoreError::from_response(status.as_u16(), &body);
                    if attempt < max_retries {
                        log::warn!("  HTTP {status}: {error}");
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }

                if status.is_client_error() {
                    let body = response.text().await.unwrap_or_default();
                    let error = StoreError::from_response(status.as_u16(), &body);
                    log::debug!("store rejected request: HTTP {status}: {}", preview(&body));
                    return Err(error);
                }

                return Ok(response);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| StoreError::Remote {
        status: 0,
        code: None,
        message: "request failed after all retries".to_string(),
    }))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

fn preview(text: &str) -> &str {
    if text.len() <= BODY_PREVIEW_LEN {
        return text;
    }
    let mut end = BODY_PREVIEW_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
