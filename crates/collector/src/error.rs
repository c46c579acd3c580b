//! Collector Error Types

use gps_receiver::GpsError;
use influx_sink::SinkError;
use obd_protocol::ObdError;
use thiserror::Error;

/// Configuration problems detected before any hardware is opened
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Errors that end a collection run
#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("OBD connection failed: {0}")]
    Obd(#[from] ObdError),

    #[error("GPS receiver failed: {0}")]
    Gps(#[from] GpsError),

    #[error("Sink failed: {0}")]
    Sink(#[from] SinkError),
}
