//! GPS Error Types

use thiserror::Error;

/// Errors raised by the GPS receiver
#[derive(Debug, Error)]
pub enum GpsError {
    /// Serial port error
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// The sentence stream ended (port unplugged or reader stopped)
    #[error("GPS sentence stream ended")]
    StreamClosed,

    /// The receiver was already closed
    #[error("GPS receiver is closed")]
    Closed,

    /// A configuration command could not be built
    #[error("Invalid receiver command: {0}")]
    InvalidCommand(String),
}

impl From<std::io::Error> for GpsError {
    fn from(err: std::io::Error) -> Self {
        GpsError::SerialError(err.to_string())
    }
}

impl From<tokio_serial::Error> for GpsError {
    fn from(err: tokio_serial::Error) -> Self {
        GpsError::SerialError(err.to_string())
    }
}
