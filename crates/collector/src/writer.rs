//! Record to point conversion and bounded sink writes

use crate::record::Record;
use influx_sink::{Point, PointSink, SinkError};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Measurement every record is written under
pub const MEASUREMENT: &str = "obd_data";

/// What happened to a record handed to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The write timed out or failed transiently; the record is gone
    Dropped,
}

/// Owns the sink client and bounds every write
pub struct SinkWriter<S> {
    sink: Option<S>,
    measurement: String,
    timeout: Duration,
}

impl<S: PointSink> SinkWriter<S> {
    pub fn new(sink: S, timeout: Duration) -> Self {
        Self {
            sink: Some(sink),
            measurement: MEASUREMENT.to_string(),
            timeout,
        }
    }

    /// Build the point for a record
    pub fn point(&self, record: &Record, timestamp_ns: Option<i64>) -> Point {
        let point = record
            .iter()
            .fold(Point::new(self.measurement.as_str()), |point, (key, value)| {
                point.field(key, value)
            });
        match timestamp_ns {
            Some(ts) => point.timestamp(ts),
            None => point,
        }
    }

    /// Write one non-empty record.
    ///
    /// Only errors that no later write could recover from are returned.
    pub async fn write(
        &mut self,
        record: &Record,
        timestamp_ns: Option<i64>,
    ) -> Result<WriteOutcome, SinkError> {
        let point = self.point(record, timestamp_ns);
        let sink = self.sink.as_mut().ok_or(SinkError::Closed)?;

        match timeout(self.timeout, sink.write(point)).await {
            Ok(Ok(())) => {
                debug!("Wrote {} fields to {}", record.len(), self.measurement);
                Ok(WriteOutcome::Written)
            }
            Ok(Err(e)) if e.is_fatal() => Err(e),
            Ok(Err(e)) => {
                warn!("Dropping record {}: {}", record, e);
                Ok(WriteOutcome::Dropped)
            }
            Err(_) => {
                warn!(
                    "Dropping record {}: {}",
                    record,
                    SinkError::Timeout(self.timeout)
                );
                Ok(WriteOutcome::Dropped)
            }
        }
    }

    /// Flush and close the sink once; later calls do nothing
    pub async fn release(&mut self) -> Result<(), SinkError> {
        let Some(mut sink) = self.sink.take() else {
            return Ok(());
        };
        timeout(self.timeout, sink.close())
            .await
            .map_err(|_| SinkError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::FakeSink;
    use std::sync::atomic::Ordering;

    fn record() -> Record {
        [("rpm", 1500.0), ("speed", 40.0)].into_iter().collect()
    }

    #[tokio::test]
    async fn test_record_becomes_one_point() {
        let sink = FakeSink::new();
        let points = sink.points.clone();
        let mut writer = SinkWriter::new(sink, Duration::from_secs(5));

        let outcome = writer.write(&record(), Some(42)).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Written);

        let points = points.lock().unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].measurement(), "obd_data");
        assert_eq!(points[0].get("rpm"), Some(1500.0));
        assert_eq!(points[0].get("speed"), Some(40.0));
        assert_eq!(points[0].to_line().unwrap(), "obd_data rpm=1500,speed=40 42");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_write_dropped() {
        let sink = FakeSink::new().stalling(Duration::from_secs(60));
        let points = sink.points.clone();
        let mut writer = SinkWriter::new(sink, Duration::from_secs(5));

        let outcome = writer.write(&record(), None).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Dropped);
        assert!(points.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transient_error_dropped() {
        let sink = FakeSink::new().failing(|| SinkError::Server {
            status: 503,
            message: "unavailable".into(),
        });
        let mut writer = SinkWriter::new(sink, Duration::from_secs(5));
        assert_eq!(
            writer.write(&record(), None).await.unwrap(),
            WriteOutcome::Dropped
        );
    }

    #[tokio::test]
    async fn test_fatal_error_returned() {
        let sink = FakeSink::new().failing(|| SinkError::Unauthorized("bad token".into()));
        let mut writer = SinkWriter::new(sink, Duration::from_secs(5));
        let err = writer.write(&record(), None).await.unwrap_err();
        assert!(matches!(err, SinkError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_release_once() {
        let sink = FakeSink::new();
        let closes = sink.closes.clone();
        let mut writer = SinkWriter::new(sink, Duration::from_secs(5));

        writer.release().await.unwrap();
        writer.release().await.unwrap();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(matches!(
            writer.write(&record(), None).await,
            Err(SinkError::Closed)
        ));
    }
}
