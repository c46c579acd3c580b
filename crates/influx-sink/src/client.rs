//! InfluxDB v2 HTTP client

use crate::point::Point;
use crate::{InfluxConfig, PointSink, SinkError};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Error document returned by the write API
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Batching writer for the `/api/v2/write` endpoint
pub struct InfluxClient {
    config: InfluxConfig,
    http: reqwest::Client,
    write_url: Url,
    pending: Vec<String>,
    closed: bool,
}

impl InfluxClient {
    /// Create a client; no request is made until the first flush
    pub fn new(config: InfluxConfig) -> Result<Self, SinkError> {
        let base = config.url.trim_end_matches('/');
        let mut write_url = Url::parse(&format!("{}/api/v2/write", base))
            .map_err(|e| SinkError::InvalidUrl(format!("{}: {}", config.url, e)))?;
        write_url
            .query_pairs_mut()
            .append_pair("org", &config.org)
            .append_pair("bucket", &config.bucket)
            .append_pair("precision", "ns");

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        info!(
            "InfluxDB sink ready: {} (org {}, bucket {}, batch size {})",
            base, config.org, config.bucket, config.batch_size
        );

        Ok(Self {
            config,
            http,
            write_url,
            pending: Vec::new(),
            closed: false,
        })
    }

    /// Number of encoded points waiting for the next flush
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn send(&self, body: String) -> Result<(), SinkError> {
        let response = self
            .http
            .post(self.write_url.clone())
            .header(AUTHORIZATION, format!("Token {}", self.config.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| classify_transport(e, self.config.timeout))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(classify_status(status.as_u16(), &text))
    }
}

fn classify_transport(err: reqwest::Error, timeout: Duration) -> SinkError {
    if err.is_timeout() {
        SinkError::Timeout(timeout)
    } else {
        SinkError::Transport(err.to_string())
    }
}

fn classify_status(status: u16, body: &str) -> SinkError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.trim().to_string());
    match status {
        401 | 403 => SinkError::Unauthorized(message),
        404 => SinkError::NotFound(message),
        400 | 413 | 422 => SinkError::Rejected(message),
        _ => SinkError::Server { status, message },
    }
}

impl PointSink for InfluxClient {
    async fn write(&mut self, point: Point) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.pending.push(point.to_line()?);
        if self.pending.len() >= self.config.batch_size.max(1) {
            self.flush().await
        } else {
            Ok(())
        }
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        // Failed batches are not replayed
        let lines = std::mem::take(&mut self.pending);
        debug!("Writing {} point(s) to InfluxDB", lines.len());
        let result = self.send(lines.join("\n")).await;
        if let Err(e) = &result {
            warn!("Dropped {} point(s): {}", lines.len(), e);
        }
        result
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        let result = self.flush().await;
        self.closed = true;
        info!("InfluxDB sink closed");
        result
    }
}
