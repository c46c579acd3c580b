//! OBD-II PID Definitions and Response Parsing
//!
//! Defines the standard OBD-II Parameter IDs (PIDs) and their decoding formulas.

use crate::error::ObdError;

/// Mode 01 PIDs the logger samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Pid {
    /// Engine RPM (0x0C)
    Rpm = 0x0C,
    /// Vehicle speed (0x0D)
    Speed = 0x0D,
    /// Mass air flow rate (0x10)
    Maf = 0x10,
}

impl Pid {
    /// Get the PID hex value
    pub fn as_hex(&self) -> u8 {
        *self as u8
    }

    /// Get the number of data bytes the vehicle answers with
    pub fn response_bytes(&self) -> usize {
        match self {
            Pid::Rpm | Pid::Maf => 2,
            Pid::Speed => 1,
        }
    }

    /// Short field name used when the value leaves the process
    pub fn name(&self) -> &'static str {
        match self {
            Pid::Rpm => "rpm",
            Pid::Speed => "speed",
            Pid::Maf => "maf",
        }
    }

    /// ELM327 request string for this PID in mode 01, without the carriage return
    pub fn request(&self) -> String {
        format!("{:02X}{:02X}", crate::mode::CURRENT_DATA, self.as_hex())
    }
}

/// Response from a PID query
#[derive(Debug, Clone, PartialEq)]
pub struct PidResponse {
    /// The PID that was queried
    pub pid: u8,
    /// Timestamp when the response was received (Unix ms)
    pub timestamp_ms: u64,
    /// Decoded value
    pub value: f64,
    /// Raw bytes from the response
    pub raw_bytes: Vec<u8>,
}

impl PidResponse {
    /// Create a new PID response by decoding raw data bytes
    pub fn decode(pid: Pid, raw_bytes: Vec<u8>, timestamp_ms: u64) -> Result<Self, ObdError> {
        if raw_bytes.len() < pid.response_bytes() {
            return Err(ObdError::InvalidResponse(format!(
                "PID {:02X} needs {} data bytes, got {}",
                pid.as_hex(),
                pid.response_bytes(),
                raw_bytes.len()
            )));
        }

        let value = Self::decode_value(pid, &raw_bytes);
        Ok(Self {
            pid: pid.as_hex(),
            timestamp_ms,
            value,
            raw_bytes,
        })
    }

    /// Decode the raw bytes to a value based on the PID formula
    fn decode_value(pid: Pid, bytes: &[u8]) -> f64 {
        let a = bytes[0] as f64;
        match pid {
            // RPM: ((A*256)+B)/4
            Pid::Rpm => ((a * 256.0) + bytes[1] as f64) / 4.0,
            // Speed: A (km/h)
            Pid::Speed => a,
            // MAF: ((A*256)+B) / 100 (g/s)
            Pid::Maf => ((a * 256.0) + bytes[1] as f64) / 100.0,
        }
    }
}
