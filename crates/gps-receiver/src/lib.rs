//! GPS Receiver
//!
//! NMEA receivers stream sentences continuously over a serial port. A
//! background task decodes GGA/RMC sentences as they arrive and keeps only
//! the newest fix; [`NmeaReceiver::update`] picks it up without blocking.

mod command;
mod error;
mod fix;
mod receiver;

pub use command::{checksum, frame, MtkCommand};
pub use error::GpsError;
pub use fix::{FixState, SentenceDecoder};
pub use receiver::{GpsReceiver, NmeaReceiver};

/// Default baud rate of MTK-based receivers
pub const DEFAULT_BAUD_RATE: u32 = 9600;
