//! OBD-II Protocol Implementation
//!
//! This crate provides async serial communication with ELM327-compatible
//! OBD-II adapters. It supports ISO 15765-4 (CAN) and legacy protocols.
//!
//! Queries distinguish three outcomes: a decoded value, an expected
//! absence (`Ok(None)`, the vehicle does not answer that PID), and an
//! [`ObdError`] whose [`ObdError::is_transport_fault`] tells callers
//! whether the adapter link itself is gone.

mod client;
mod connection;
mod elm327;
mod error;
mod pid;
mod protocol;

pub use client::{ObdClient, DEFAULT_TIMEOUT_MS};
pub use connection::ObdConnection;
pub use elm327::ElmReply;
pub use error::ObdError;
pub use pid::{Pid, PidResponse};
pub use protocol::ObdProtocol;

/// OBD-II mode constants
pub mod mode {
    /// Current data
    pub const CURRENT_DATA: u8 = 0x01;
    /// Positive response offset added to the request mode
    pub const RESPONSE_OFFSET: u8 = 0x40;
}
