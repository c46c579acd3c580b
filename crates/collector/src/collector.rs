//! Collection loop
//!
//! Polls the OBD source on a fixed period, merges in a rate-gated GPS fix
//! and writes every non-empty record. On shutdown or a fatal fault the
//! loop drains and releases the sink, the OBD link and the GPS receiver.

use crate::error::CollectorError;
use crate::gps_source::GpsSource;
use crate::obd_source::ObdSource;
use crate::record::{merge, Record};
use crate::writer::{SinkWriter, WriteOutcome};
use chrono::Utc;
use gps_receiver::GpsReceiver;
use influx_sink::PointSink;
use metrics::counter;
use obd_protocol::ObdConnection;
use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Loop lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    Running,
    Draining,
    Stopped,
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Neither source produced a value; nothing was written
    Empty,
    Written(Record),
    Dropped(Record),
}

pub struct Collector<C, G, S> {
    obd: ObdSource<C>,
    gps: Option<GpsSource<G>>,
    writer: SinkWriter<S>,
    period: Duration,
    state: CollectorState,
}

impl<C, G, S> Collector<C, G, S>
where
    C: ObdConnection,
    G: GpsReceiver,
    S: PointSink,
{
    pub fn new(obd: ObdSource<C>, writer: SinkWriter<S>, period: Duration) -> Self {
        Self {
            obd,
            gps: None,
            writer,
            period,
            state: CollectorState::Running,
        }
    }

    /// Merge fixes from a GPS receiver into each record
    pub fn with_gps(mut self, gps: GpsSource<G>) -> Self {
        self.gps = Some(gps);
        self
    }

    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// Poll until `shutdown` resolves or a fatal fault occurs, then release
    /// every resource.
    ///
    /// Shutdown is only observed between ticks, so a tick that has started
    /// always finishes its write. The fault that stopped the loop takes
    /// precedence over release errors.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), CollectorError>
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        if let Some(gps) = self.gps.as_mut() {
            gps.restart_gate(start);
        }
        let mut ticker = interval_at(start, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            "Collecting every {:?} (GPS {})",
            self.period,
            if self.gps.is_some() { "enabled" } else { "disabled" }
        );

        let result = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, draining");
                    break Ok(());
                }
                scheduled = ticker.tick() => {
                    if let Err(e) = self.tick(scheduled).await {
                        error!("Stopping collection: {}", e);
                        break Err(e);
                    }
                }
            }
        };

        self.state = CollectorState::Draining;
        let released = self.release().await;
        self.state = CollectorState::Stopped;
        info!("Collector stopped");

        result.and(released)
    }

    /// Run one sample, merge and write cycle for the tick scheduled at `now`
    pub async fn tick(&mut self, now: Instant) -> Result<TickOutcome, CollectorError> {
        counter!("collector_ticks_total").increment(1);
        let timestamp_ns = Utc::now().timestamp_nanos_opt();

        let readings = self.obd.sample().await?;
        let fix = self.gps.as_mut().and_then(|gps| gps.tick(now));
        let record = merge(readings, fix);

        if record.is_empty() {
            counter!("collector_empty_ticks_total").increment(1);
            info!("No data this tick");
            return Ok(TickOutcome::Empty);
        }

        info!("OBD data: {}", record);
        match self.writer.write(&record, timestamp_ns).await? {
            WriteOutcome::Written => {
                counter!("collector_records_written_total").increment(1);
                Ok(TickOutcome::Written(record))
            }
            WriteOutcome::Dropped => {
                counter!("collector_records_dropped_total").increment(1);
                Ok(TickOutcome::Dropped(record))
            }
        }
    }

    /// Release the sink, the OBD connection and the GPS receiver in that order.
    ///
    /// Every release is attempted; the first failure is returned. Resources
    /// already released are skipped, so calling this again is harmless.
    pub async fn release(&mut self) -> Result<(), CollectorError> {
        let sink = self.writer.release().await.map_err(CollectorError::from);
        let obd = self.obd.release().await.map_err(CollectorError::from);
        let gps = match self.gps.as_mut() {
            Some(gps) => gps.release().await.map_err(CollectorError::from),
            None => Ok(()),
        };

        let failures: Vec<CollectorError> = [sink, obd, gps]
            .into_iter()
            .filter_map(Result::err)
            .collect();
        for e in &failures {
            error!("Release failed: {}", e);
        }
        match failures.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }
}
