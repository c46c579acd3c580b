//! OBD/GPS Telemetry Collector
//!
//! Samples engine parameters from an ELM327 adapter on a fixed period,
//! optionally merges a rate-gated GPS fix, and writes each non-empty
//! record as one InfluxDB point.

pub mod collector;
pub mod config;
pub mod error;
pub mod gps_source;
pub mod obd_source;
pub mod record;
pub mod writer;

#[cfg(test)]
mod fakes;

pub use collector::{Collector, CollectorState, TickOutcome};
pub use crate::config::{CollectorConfig, GpsSettings, ObdSettings};
pub use error::{CollectorError, ConfigError};
pub use gps_source::{GpsSource, RateGate};
pub use obd_source::{ObdSource, DEFAULT_PARAMETERS};
pub use record::{merge, PositionFix, Record};
pub use writer::{SinkWriter, WriteOutcome, MEASUREMENT};

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
