//! MTK configuration commands
//!
//! MTK chipsets take proprietary `$PMTK` sentences framed like any other
//! NMEA sentence: `$<body>*<xor checksum>\r\n`.

use crate::error::GpsError;
use std::time::Duration;

/// XOR of every byte between `$` and `*`
pub fn checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Frame a sentence body for the wire
pub fn frame(body: &str) -> Vec<u8> {
    format!("${}*{:02X}\r\n", body, checksum(body)).into_bytes()
}

/// Startup commands understood by MTK receivers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MtkCommand {
    /// Emit only RMC and GGA sentences
    OutputRmcGga,
    /// Set the position fix interval
    UpdateRate(Duration),
}

impl MtkCommand {
    /// Sentence body without framing
    pub fn body(&self) -> Result<String, GpsError> {
        match self {
            MtkCommand::OutputRmcGga => {
                Ok("PMTK314,0,1,0,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0".to_string())
            }
            MtkCommand::UpdateRate(interval) => {
                let ms = interval.as_millis();
                if !(100..=10_000).contains(&ms) {
                    return Err(GpsError::InvalidCommand(format!(
                        "update interval {}ms outside 100..=10000",
                        ms
                    )));
                }
                Ok(format!("PMTK220,{}", ms))
            }
        }
    }

    /// Framed bytes ready to write to the receiver
    pub fn to_bytes(&self) -> Result<Vec<u8>, GpsError> {
        Ok(frame(&self.body()?))
    }
}
