//! Shared HTTP plumbing for the remote clients.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response};

use crate::types::{AppError, Result};

/// Build a JSON client with the given default headers and request timeout.
pub fn json_client(service: &str, mut headers: HeaderMap, timeout: Duration) -> Result<Client> {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()
        .map_err(|e| AppError::Configuration(format!("failed to build {} HTTP client: {}", service, e)))
}

/// Header carrying a secret, rejected early if it isn't a valid header value.
pub fn secret_header(service: &str, value: &str) -> Result<HeaderValue> {
    let mut header = HeaderValue::from_str(value.trim())
        .map_err(|_| AppError::Configuration(format!("invalid {} API key", service)))?;
    header.set_sensitive(true);
    Ok(header)
}

/// Pass successful responses through; turn everything else into
/// [`AppError::Upstream`] carrying the status code and response body.
pub async fn check_status(service: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(AppError::Upstream {
        service: service.to_string(),
        status: status.as_u16(),
        message,
    })
}
