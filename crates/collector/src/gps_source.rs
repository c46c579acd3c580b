//! Rate-gated GPS sampling

use crate::record::PositionFix;
use gps_receiver::{GpsError, GpsReceiver};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Lets one emission through per interval on the monotonic clock
#[derive(Debug, Clone, Copy)]
pub struct RateGate {
    interval: Duration,
    last_emit: Instant,
}

impl RateGate {
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            last_emit: start,
        }
    }

    /// Start counting from `start` again
    pub fn reset(&mut self, start: Instant) {
        self.last_emit = start;
    }

    /// Whether a full interval has passed since the last emission.
    /// Records `now` as the last emission when it has.
    pub fn ready(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_emit) < self.interval {
            return false;
        }
        self.last_emit = now;
        true
    }
}

/// Drives the receiver every tick and snapshots it when the gate opens
pub struct GpsSource<G> {
    receiver: Option<G>,
    gate: RateGate,
    update_failing: bool,
}

impl<G: GpsReceiver> GpsSource<G> {
    pub fn new(receiver: G, poll_interval: Duration, start: Instant) -> Self {
        Self {
            receiver: Some(receiver),
            gate: RateGate::new(poll_interval, start),
            update_failing: false,
        }
    }

    /// Restart the gate, e.g. when the collection loop starts
    pub fn restart_gate(&mut self, start: Instant) {
        self.gate.reset(start);
    }

    /// Advance the receiver and return a fix if the gate has elapsed.
    ///
    /// The receiver is updated on every call whether or not a fix is
    /// returned. Fixes are returned even before the receiver has one; their
    /// fields then hold whatever the receiver last reported.
    pub fn tick(&mut self, now: Instant) -> Option<PositionFix> {
        let receiver = self.receiver.as_mut()?;

        match receiver.update() {
            Ok(_) => self.update_failing = false,
            Err(e) => {
                if !self.update_failing {
                    warn!("GPS update failed: {}", e);
                }
                self.update_failing = true;
            }
        }

        if !self.gate.ready(now) {
            return None;
        }

        if !receiver.has_fix() {
            info!("Waiting for GPS fix...");
        }

        Some(PositionFix {
            latitude: receiver.latitude(),
            longitude: receiver.longitude(),
            altitude: receiver.altitude_m().filter(|alt| !alt.is_nan()),
            heading: receiver.track_angle_deg(),
        })
    }

    /// Close the receiver once; later calls do nothing
    pub async fn release(&mut self) -> Result<(), GpsError> {
        match self.receiver.take() {
            Some(mut receiver) => receiver.close().await,
            None => Ok(()),
        }
    }
}
