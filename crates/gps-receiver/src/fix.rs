//! Fix tracking from GGA and RMC sentences

use nmea0183::{ParseResult, Parser};
use tracing::debug;

/// Latest values observed on the sentence stream.
///
/// Fields keep their last reported value when the fix is lost, so readers
/// must check [`FixState::has_fix`] if stale data matters to them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FixState {
    /// Whether the most recent GGA/RMC sentence carried a valid fix
    pub has_fix: bool,
    /// Latitude in degrees from GGA
    pub latitude: Option<f64>,
    /// Longitude in degrees from GGA
    pub longitude: Option<f64>,
    /// Altitude above mean sea level in meters from GGA
    pub altitude_m: Option<f64>,
    /// Course over ground in degrees from RMC
    pub track_angle_deg: Option<f64>,
}

impl FixState {
    fn update_from_gga(&mut self, gga: &nmea0183::GGA) {
        self.has_fix = true;
        self.latitude = Some(gga.latitude.as_f64());
        self.longitude = Some(gga.longitude.as_f64());
        self.altitude_m = Some(gga.altitude.meters as f64).filter(|m| m.is_finite());
    }

    fn update_from_rmc(&mut self, rmc: &nmea0183::RMC) {
        self.has_fix = true;
        // Receivers omit the course while stationary; keep the last heading
        if let Some(course) = &rmc.course {
            self.track_angle_deg = Some(course.degrees as f64);
        }
    }
}

/// Byte-level NMEA decoder that folds sentences into a [`FixState`]
pub struct SentenceDecoder {
    parser: Parser,
    state: FixState,
}

impl SentenceDecoder {
    /// Create a decoder with no fix
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            state: FixState::default(),
        }
    }

    /// Feed raw bytes; returns how many GGA/RMC sentences were applied
    pub fn feed(&mut self, bytes: &[u8]) -> usize {
        let mut applied = 0;
        for &byte in bytes {
            let Some(result) = self.parser.parse_from_byte(byte) else {
                continue;
            };
            match result {
                Ok(ParseResult::GGA(Some(gga))) => {
                    self.state.update_from_gga(&gga);
                    applied += 1;
                }
                Ok(ParseResult::RMC(Some(rmc))) => {
                    self.state.update_from_rmc(&rmc);
                    applied += 1;
                }
                Ok(ParseResult::GGA(None)) | Ok(ParseResult::RMC(None)) => {
                    self.state.has_fix = false;
                    applied += 1;
                }
                Ok(_) => {}
                Err(e) => debug!("Rejected NMEA sentence: {}", e),
            }
        }
        applied
    }

    /// Current fix snapshot
    pub fn state(&self) -> &FixState {
        &self.state
    }
}

impl Default for SentenceDecoder {
    fn default() -> Self {
        Self::new()
    }
}
