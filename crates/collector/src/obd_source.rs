//! OBD sampling: one query per configured PID per tick

use crate::record::Record;
use obd_protocol::{ObdConnection, ObdError, Pid};
use tracing::{debug, error, info, warn};

/// PIDs sampled on every tick
pub const DEFAULT_PARAMETERS: [Pid; 3] = [Pid::Rpm, Pid::Maf, Pid::Speed];

/// Samples a fixed PID set from a long-lived OBD connection
pub struct ObdSource<C> {
    connection: Option<C>,
    parameters: Vec<Pid>,
    max_failed_ticks: u32,
    failed_ticks: u32,
}

impl<C: ObdConnection> ObdSource<C> {
    /// `max_failed_ticks` is how many ticks in a row may see every query
    /// fail before the adapter is declared dead.
    pub fn new(connection: C, parameters: Vec<Pid>, max_failed_ticks: u32) -> Self {
        info!(
            "OBD source sampling {:?}",
            parameters.iter().map(Pid::name).collect::<Vec<_>>()
        );
        Self {
            connection: Some(connection),
            parameters,
            max_failed_ticks: max_failed_ticks.max(1),
            failed_ticks: 0,
        }
    }

    /// Query every parameter once.
    ///
    /// Unanswered PIDs are left out of the result and a failed query only
    /// costs its own field for this tick. A transport fault is returned at
    /// once; a run of ticks in which every query failed is returned as
    /// [`ObdError::AdapterNotResponding`].
    pub async fn sample(&mut self) -> Result<Record, ObdError> {
        let connection = self.connection.as_mut().ok_or(ObdError::Disconnected)?;
        let mut readings = Record::new();
        let mut failed = 0;

        for pid in &self.parameters {
            match connection.query(*pid).await {
                Ok(Some(response)) => readings.insert(pid.name(), response.value),
                Ok(None) => debug!("{} not reported this tick", pid.name()),
                Err(e) if e.is_transport_fault() => {
                    error!("OBD transport fault while reading {}: {}", pid.name(), e);
                    return Err(e);
                }
                Err(e) => {
                    failed += 1;
                    warn!("Skipping {} this tick: {}", pid.name(), e);
                }
            }
        }

        if failed == 0 || failed < self.parameters.len() {
            self.failed_ticks = 0;
            return Ok(readings);
        }

        self.failed_ticks += 1;
        if self.failed_ticks >= self.max_failed_ticks {
            error!(
                "Every OBD query failed for {} ticks in a row, giving up on the adapter",
                self.failed_ticks
            );
            return Err(ObdError::AdapterNotResponding);
        }
        warn!(
            "Adapter silent this tick ({}/{})",
            self.failed_ticks, self.max_failed_ticks
        );
        Ok(readings)
    }

    /// Close the connection once; later calls do nothing
    pub async fn release(&mut self) -> Result<(), ObdError> {
        match self.connection.take() {
            Some(mut connection) => connection.close().await,
            None => Ok(()),
        }
    }
}
