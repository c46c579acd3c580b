//! OBD-II Error Types

use thiserror::Error;

/// Errors that can occur during OBD-II communication
#[derive(Debug, Error)]
pub enum ObdError {
    /// Serial port connection error
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Timeout waiting for response
    #[error("Timeout waiting for OBD response after {0}ms")]
    Timeout(u64),

    /// Invalid response from adapter
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Protocol not supported
    #[error("Protocol not supported: {0}")]
    UnsupportedProtocol(String),

    /// Adapter not responding
    #[error("OBD adapter not responding")]
    AdapterNotResponding,

    /// CAN bus error
    #[error("CAN bus error: {0}")]
    CanBusError(String),

    /// Vehicle not connected
    #[error("Vehicle ignition is off or not connected")]
    VehicleNotConnected,

    /// The connection was already closed
    #[error("OBD connection is closed")]
    Disconnected,
}

impl ObdError {
    /// Whether this error means the adapter link is unusable.
    ///
    /// Transport faults must stop polling; everything else only costs the
    /// current query.
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            ObdError::SerialError(_)
                | ObdError::AdapterNotResponding
                | ObdError::UnsupportedProtocol(_)
                | ObdError::Disconnected
        )
    }
}

impl From<std::io::Error> for ObdError {
    fn from(err: std::io::Error) -> Self {
        ObdError::SerialError(err.to_string())
    }
}

impl From<tokio_serial::Error> for ObdError {
    fn from(err: tokio_serial::Error) -> Self {
        ObdError::SerialError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_fault_classification() {
        assert!(ObdError::SerialError("gone".into()).is_transport_fault());
        assert!(ObdError::AdapterNotResponding.is_transport_fault());
        assert!(ObdError::Disconnected.is_transport_fault());

        assert!(!ObdError::Timeout(2000).is_transport_fault());
        assert!(!ObdError::VehicleNotConnected.is_transport_fault());
        assert!(!ObdError::CanBusError("CAN ERROR".into()).is_transport_fault());
        assert!(!ObdError::InvalidResponse("41".into()).is_transport_fault());
    }
}
