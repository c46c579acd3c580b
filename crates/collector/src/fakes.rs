//! In-memory OBD, GPS and sink doubles for collector tests

use gps_receiver::{GpsError, GpsReceiver};
use influx_sink::{Point, PointSink, SinkError};
use obd_protocol::{ObdConnection, ObdError, Pid, PidResponse};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct FakeObd {
    values: HashMap<Pid, f64>,
    transient: HashSet<Pid>,
    fail_after: Option<usize>,
    fail_close: bool,
    queries: usize,
    pub closes: Arc<AtomicUsize>,
}

impl FakeObd {
    pub fn new(values: &[(Pid, f64)]) -> Self {
        Self {
            values: values.iter().copied().collect(),
            transient: HashSet::new(),
            fail_after: None,
            fail_close: false,
            queries: 0,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queries for `pid` fail with a non-transport error
    pub fn with_transient(mut self, pid: Pid) -> Self {
        self.transient.insert(pid);
        self
    }

    /// The link drops after `queries` queries
    pub fn failing_after(mut self, queries: usize) -> Self {
        self.fail_after = Some(queries);
        self
    }

    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }
}

impl ObdConnection for FakeObd {
    async fn query(&mut self, pid: Pid) -> Result<Option<PidResponse>, ObdError> {
        if self.fail_after.is_some_and(|limit| self.queries >= limit) {
            return Err(ObdError::SerialError("device unplugged".into()));
        }
        self.queries += 1;

        if self.transient.contains(&pid) {
            return Err(ObdError::Timeout(2000));
        }
        Ok(self.values.get(&pid).map(|value| PidResponse {
            pid: pid.as_hex(),
            timestamp_ms: 0,
            value: *value,
            raw_bytes: Vec::new(),
        }))
    }

    async fn close(&mut self) -> Result<(), ObdError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(ObdError::SerialError("close failed".into()));
        }
        Ok(())
    }
}

pub struct FakeGps {
    pub has_fix: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub heading: Option<f64>,
    pub fail_updates: bool,
    pub updates: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeGps {
    /// A receiver holding a fix at the given position, no altitude or course
    pub fn fixed(latitude: f64, longitude: f64) -> Self {
        Self {
            has_fix: true,
            latitude: Some(latitude),
            longitude: Some(longitude),
            altitude: None,
            heading: None,
            fail_updates: false,
            updates: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl GpsReceiver for FakeGps {
    fn update(&mut self) -> Result<usize, GpsError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates {
            return Err(GpsError::StreamClosed);
        }
        Ok(0)
    }

    fn has_fix(&self) -> bool {
        self.has_fix
    }

    fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    fn altitude_m(&self) -> Option<f64> {
        self.altitude
    }

    fn track_angle_deg(&self) -> Option<f64> {
        self.heading
    }

    async fn close(&mut self) -> Result<(), GpsError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeSink {
    pub points: Arc<Mutex<Vec<Point>>>,
    pub closes: Arc<AtomicUsize>,
    error: Option<fn() -> SinkError>,
    write_delay: Option<Duration>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self {
            points: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(AtomicUsize::new(0)),
            error: None,
            write_delay: None,
        }
    }

    /// Every write fails with the error `make` builds
    pub fn failing(mut self, make: fn() -> SinkError) -> Self {
        self.error = Some(make);
        self
    }

    /// Every write sleeps this long before completing
    pub fn stalling(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }
}

impl PointSink for FakeSink {
    async fn write(&mut self, point: Point) -> Result<(), SinkError> {
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(make) = self.error {
            return Err(make());
        }
        self.points.lock().unwrap().push(point);
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
