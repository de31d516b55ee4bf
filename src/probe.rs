//! One-shot HTTP readiness probe.
//!
//! Backs the `probe` subcommand, which the compose file runs as a sidecar and
//! as the `app` service's health check. By default it fetches the URL once and
//! reports; `attempts` > 1 turns it into a bounded wait for a dependency.

use std::time::Duration;

/// What to fetch and how patiently
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Total tries, at least 1
    pub attempts: u32,
    /// Pause between failed tries
    pub interval: Duration,
}

/// A successful fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub status: u16,
    pub body_bytes: usize,
    pub attempts_used: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request { url: String, source: reqwest::Error },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

/// Fetch `options.url`, succeeding on the first 2xx response.
///
/// Returns the last error once all attempts are used up.
pub async fn run_probe(options: &ProbeOptions) -> Result<ProbeOutcome, ProbeError> {
    let client = reqwest::Client::builder()
        .timeout(options.timeout)
        .build()
        .map_err(ProbeError::Client)?;

    let attempts = options.attempts.max(1);
    let mut attempt = 1;
    loop {
        match fetch_once(&client, &options.url).await {
            Ok((status, body_bytes)) => {
                tracing::info!(url = %options.url, status, body_bytes, attempt, "Probe succeeded");
                return Ok(ProbeOutcome {
                    status,
                    body_bytes,
                    attempts_used: attempt,
                });
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(error = %e, attempt, attempts, "Probe attempt failed, retrying");
                tokio::time::sleep(options.interval).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, attempt, "Probe failed");
                return Err(e);
            }
        }
    }
}

async fn fetch_once(client: &reqwest::Client, url: &str) -> Result<(u16, usize), ProbeError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| ProbeError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(ProbeError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|source| ProbeError::Request {
        url: url.to_string(),
        source,
    })?;

    Ok((status.as_u16(), body.len()))
}
