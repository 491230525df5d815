use std::error::Error as _;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::FetchConfig;

/// How much of a failing body is kept for diagnostics.
const BODY_PREFIX_CHARS: usize = 500;

#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("HTTP status {status}")]
    Http { status: u16, body_prefix: String },
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error("invalid JSON: {message}")]
    Decode { message: String, raw_prefix: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Timeout;
        }
        // reqwest's own message hides the cause (DNS, refused, TLS)
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        FetchError::Transport { message }
    }
}

pub fn build_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    if config.accept_invalid_certs {
        log::warn!("TLS certificate verification is disabled for upstream requests");
    }

    reqwest::ClientBuilder::new()
        .timeout(config.timeout())
        .connect_timeout(config.timeout())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .user_agent(concat!("weso-leaderboard/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Single GET, no retries. The body is only parsed on a 2xx status.
pub async fn fetch_json(client: &Client, url: &str, timeout: Duration) -> Result<Value, FetchError> {
    let start = Instant::now();
    let response = client.get(url).timeout(timeout).send().await?;
    let status = response.status();

    if !status.is_success() {
        log::warn!("GET {} -> {} after {}ms", url, status, start.elapsed().as_millis());
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("GET {} -> {}, reading the error body failed: {}", url, status, e);
                return Err(e.into());
            }
        };
        return Err(FetchError::Http {
            status: status.as_u16(),
            body_prefix: prefix(&body),
        });
    }

    let body = response.text().await?;
    log::debug!(
        "GET {} -> {} ({} bytes, {}ms)",
        url,
        status,
        body.len(),
        start.elapsed().as_millis()
    );

    serde_json::from_str(&body).map_err(|e| FetchError::Decode {
        message: e.to_string(),
        raw_prefix: prefix(&body),
    })
}

fn prefix(body: &str) -> String {
    body.chars().take(BODY_PREFIX_CHARS).collect()
}
