//! Line-protocol points

use crate::SinkError;
use std::fmt::Write;

/// One time-series point with float fields
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    fields: Vec<(String, f64)>,
    timestamp_ns: Option<i64>,
}

impl Point {
    /// Start a point for the given measurement
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            fields: Vec::new(),
            timestamp_ns: None,
        }
    }

    /// Add a float field
    pub fn field(mut self, key: impl Into<String>, value: f64) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    /// Set the timestamp in nanoseconds since the Unix epoch
    pub fn timestamp(mut self, timestamp_ns: i64) -> Self {
        self.timestamp_ns = Some(timestamp_ns);
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn fields(&self) -> &[(String, f64)] {
        &self.fields
    }

    /// Value of a field by key
    pub fn get(&self, key: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| *value)
    }

    /// Encode as one line of InfluxDB line protocol.
    ///
    /// Line protocol cannot carry NaN or infinities; such fields are
    /// skipped, and a point left without fields is an error.
    pub fn to_line(&self) -> Result<String, SinkError> {
        let mut line = escape(&self.measurement, &[',', ' ']);
        let mut written = 0;
        for (key, value) in self.fields.iter().filter(|(_, v)| v.is_finite()) {
            line.push(if written == 0 { ' ' } else { ',' });
            line.push_str(&escape(key, &[',', '=', ' ']));
            // f64 Display never uses exponent notation
            let _ = write!(line, "={}", value);
            written += 1;
        }
        if written == 0 {
            return Err(SinkError::EmptyPoint(self.measurement.clone()));
        }
        if let Some(ts) = self.timestamp_ns {
            let _ = write!(line, " {}", ts);
        }
        Ok(line)
    }
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
