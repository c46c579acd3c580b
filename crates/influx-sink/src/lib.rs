//! Time-Series Sink
//!
//! Writes points to an InfluxDB v2 bucket over the HTTP write API:
//! - Line-protocol encoding with escaping
//! - Size-based batching (batch size 1 flushes every point)
//! - Error classification into fatal and per-record failures

mod client;
mod point;

pub use client::InfluxClient;
pub use point::Point;

use std::time::Duration;
use thiserror::Error;

/// Sink error types
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Invalid sink URL: {0}")]
    InvalidUrl(String),

    #[error("Point has no writable fields: {0}")]
    EmptyPoint(String),

    #[error("Write timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bucket or organization not found: {0}")]
    NotFound(String),

    #[error("Points rejected: {0}")]
    Rejected(String),

    #[error("Sink client is closed")]
    Closed,
}

impl SinkError {
    /// Whether retrying later can never succeed with the current setup.
    ///
    /// Fatal errors stop collection; the rest only cost the current record.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SinkError::InvalidUrl(_)
                | SinkError::Unauthorized(_)
                | SinkError::NotFound(_)
                | SinkError::Rejected(_)
                | SinkError::Closed
        )
    }
}

/// InfluxDB connection configuration
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    /// Server base URL, e.g. `http://localhost:8086`
    pub url: String,
    /// API token
    pub token: String,
    /// Organization name
    pub org: String,
    /// Target bucket
    pub bucket: String,
    /// Points buffered before an HTTP write
    pub batch_size: usize,
    /// HTTP request timeout
    pub timeout: Duration,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            token: String::new(),
            org: String::new(),
            bucket: String::new(),
            batch_size: 1,
            timeout: Duration::from_secs(5),
        }
    }
}

/// A destination that accepts one point at a time
#[allow(async_fn_in_trait)]
pub trait PointSink {
    /// Queue a point, writing the batch when it is full
    async fn write(&mut self, point: Point) -> Result<(), SinkError>;

    /// Write any queued points now
    async fn flush(&mut self) -> Result<(), SinkError>;

    /// Flush and release the client. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), SinkError>;
}
