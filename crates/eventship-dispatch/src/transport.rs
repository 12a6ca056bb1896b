//! HTTP transport: POSTs batch payloads to the collector.
//! A batch counts as delivered only on status 200; everything else,
//! including a request that outlives the timeout, is a failed attempt.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use eventship_core::config::ShipperConfig;
use eventship_core::error::{Result, ShipError};
use eventship_core::traits::Transport;

/// Collector endpoint reached over HTTP(S).
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
    headers: Vec<(String, String)>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.to_string(),
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn from_config(config: &ShipperConfig) -> Self {
        Self::new(&config.endpoint_url, config.request_timeout()).with_headers(&config.headers)
    }

    /// Extra headers sent with every batch.
    /// `Content-Type` is always `application/json` and cannot be overridden.
    pub fn with_headers(mut self, headers: &BTreeMap<String, String>) -> Self {
        self.headers = headers
            .iter()
            .filter(|(k, _)| {
                let content_type = k.eq_ignore_ascii_case("content-type");
                if content_type {
                    tracing::warn!("⚠️ Ignoring configured '{k}' header, batches are always JSON");
                }
                !content_type
            })
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, payload: &str) -> Result<()> {
        let mut req = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .body(payload.to_string())
            .timeout(self.timeout);

        for (key, value) in &self.headers {
            req = req.header(key.as_str(), value.as_str());
        }

        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ShipError::Transport(format!("Timed out after {:?}: {}", self.timeout, self.url))
            } else {
                ShipError::Transport(format!("POST {} failed: {e}", self.url))
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::OK {
            tracing::debug!("🌐 Collector accepted batch: {} {}", status, self.url);
            Ok(())
        } else {
            Err(ShipError::Status(status.as_u16()))
        }
    }
}
