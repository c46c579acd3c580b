//! Environment-sourced configuration
//!
//! Every setting comes from the process environment. Required sink
//! settings are checked here so a misconfigured logger exits before it
//! touches the adapter or the GPS port.

use crate::error::ConfigError;
use config::{Config, Environment};
use influx_sink::InfluxConfig;
use obd_protocol::ObdProtocol;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// Raw values as read from the environment
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvSettings {
    influxdb_url: Option<String>,
    influxdb_token: Option<String>,
    influxdb_org: Option<String>,
    influxdb_bucket: Option<String>,
    influxdb_batch_size: Option<usize>,
    sink_write_timeout: Option<f64>,
    poll_interval: Option<f64>,
    obd_port: Option<String>,
    obd_baud: Option<u32>,
    obd_protocol: Option<String>,
    obd_timeout: Option<f64>,
    obd_max_failures: Option<u32>,
    gps_port: Option<String>,
    gps_baud: Option<u32>,
    gps_update_ms: Option<u64>,
    log_level: Option<String>,
    metrics_listen: Option<String>,
}

/// OBD adapter settings
#[derive(Debug, Clone)]
pub struct ObdSettings {
    /// Serial device of the ELM327 adapter
    pub port: String,
    pub baud_rate: u32,
    pub protocol: ObdProtocol,
    /// Per-query read timeout
    pub timeout: Duration,
    /// Ticks in a row with every query failing before the adapter is declared dead
    pub max_failed_ticks: u32,
}

impl Default for ObdSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 38400,
            protocol: ObdProtocol::Auto,
            timeout: Duration::from_millis(obd_protocol::DEFAULT_TIMEOUT_MS),
            max_failed_ticks: 3,
        }
    }
}

/// GPS receiver settings; present only when a GPS port is configured
#[derive(Debug, Clone)]
pub struct GpsSettings {
    pub port: String,
    pub baud_rate: u32,
    /// Receiver fix interval
    pub update_interval: Duration,
}

/// Validated collector configuration
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub sink: InfluxConfig,
    /// Upper bound on a single sink write
    pub write_timeout: Duration,
    /// Tick period, also the GPS emission interval
    pub poll_interval: Duration,
    pub obd: ObdSettings,
    pub gps: Option<GpsSettings>,
    pub log_level: Level,
    pub metrics_listen: Option<SocketAddr>,
}

impl CollectorConfig {
    /// Read and validate the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::default())
    }

    /// Read and validate an explicit environment source
    pub fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let settings: EnvSettings = Config::builder()
            .add_source(environment.ignore_empty(true))
            .build()?
            .try_deserialize()?;
        Self::validate(settings)
    }

    fn validate(env: EnvSettings) -> Result<Self, ConfigError> {
        let url = required("INFLUXDB_URL", env.influxdb_url)?;
        let token = required("INFLUXDB_TOKEN", env.influxdb_token)?;
        let org = required("INFLUXDB_ORG", env.influxdb_org)?;
        let bucket = required("INFLUXDB_BUCKET", env.influxdb_bucket)?;

        let batch_size = env.influxdb_batch_size.unwrap_or(1);
        if batch_size == 0 {
            return Err(invalid("INFLUXDB_BATCH_SIZE", "must be at least 1"));
        }
        let write_timeout = seconds("SINK_WRITE_TIMEOUT", env.sink_write_timeout.unwrap_or(5.0))?;
        let poll_interval = seconds("POLL_INTERVAL", env.poll_interval.unwrap_or(1.0))?;

        let defaults = ObdSettings::default();
        let protocol = match env.obd_protocol {
            Some(raw) => raw
                .parse()
                .map_err(|e: obd_protocol::ObdError| invalid("OBD_PROTOCOL", e))?,
            None => defaults.protocol,
        };
        let obd_timeout = match env.obd_timeout {
            Some(secs) => seconds("OBD_TIMEOUT", secs)?,
            None => defaults.timeout,
        };
        let max_failed_ticks = env
            .obd_max_failures
            .unwrap_or(defaults.max_failed_ticks);
        if max_failed_ticks == 0 {
            return Err(invalid("OBD_MAX_FAILURES", "must be at least 1"));
        }
        let obd = ObdSettings {
            port: env.obd_port.unwrap_or(defaults.port),
            baud_rate: env.obd_baud.unwrap_or(defaults.baud_rate),
            protocol,
            timeout: obd_timeout,
            max_failed_ticks,
        };

        let gps = env.gps_port.map(|port| GpsSettings {
            port,
            baud_rate: env.gps_baud.unwrap_or(gps_receiver::DEFAULT_BAUD_RATE),
            update_interval: Duration::from_millis(env.gps_update_ms.unwrap_or(1000)),
        });

        let log_level = match env.log_level {
            Some(raw) => raw
                .parse::<Level>()
                .map_err(|e| invalid("LOG_LEVEL", e))?,
            None => Level::INFO,
        };
        let metrics_listen = env
            .metrics_listen
            .map(|raw| raw.parse::<SocketAddr>())
            .transpose()
            .map_err(|e| invalid("METRICS_LISTEN", e))?;

        Ok(Self {
            sink: InfluxConfig {
                url,
                token,
                org,
                bucket,
                batch_size,
                timeout: write_timeout,
            },
            write_timeout,
            poll_interval,
            obd,
            gps,
            log_level,
            metrics_listen,
        })
    }
}

fn required(name: &'static str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn seconds(name: &'static str, secs: f64) -> Result<Duration, ConfigError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(invalid(name, format!("{} is not a usable number of seconds", secs))),
    }
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment(pairs: &[(&str, &str)]) -> Environment {
        let map: ::config::Map<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().source(Some(map))
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("INFLUXDB_URL", "http://localhost:8086"),
        ("INFLUXDB_TOKEN", "secret"),
        ("INFLUXDB_ORG", "acme"),
        ("INFLUXDB_BUCKET", "vehicle"),
    ];

    #[test]
    fn test_defaults() {
        let config = CollectorConfig::from_environment(environment(&REQUIRED)).unwrap();
        assert_eq!(config.sink.url, "http://localhost:8086");
        assert_eq!(config.sink.batch_size, 1);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert_eq!(config.obd.port, "/dev/ttyUSB0");
        assert_eq!(config.obd.baud_rate, 38400);
        assert_eq!(config.obd.protocol, ObdProtocol::Auto);
        assert!(config.gps.is_none());
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.metrics_listen.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("POLL_INTERVAL", "0.5"),
            ("INFLUXDB_BATCH_SIZE", "10"),
            ("OBD_PROTOCOL", "6"),
            ("GPS_PORT", "/dev/serial0"),
            ("GPS_UPDATE_MS", "200"),
            ("LOG_LEVEL", "debug"),
            ("METRICS_LISTEN", "127.0.0.1:9000"),
        ]);
        let config = CollectorConfig::from_environment(environment(&pairs)).unwrap();
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.sink.batch_size, 10);
        assert_eq!(config.obd.protocol, ObdProtocol::Iso15765_4Can11bit500);
        let gps = config.gps.unwrap();
        assert_eq!(gps.port, "/dev/serial0");
        assert_eq!(gps.baud_rate, 9600);
        assert_eq!(gps.update_interval, Duration::from_millis(200));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.metrics_listen, Some("127.0.0.1:9000".parse().unwrap()));
    }

    #[test]
    fn test_missing_required_value() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "INFLUXDB_TOKEN")
            .collect();
        let err = CollectorConfig::from_environment(environment(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("INFLUXDB_TOKEN")));
    }

    #[test]
    fn test_empty_required_value_is_missing() {
        let mut pairs = REQUIRED.to_vec();
        pairs[3] = ("INFLUXDB_BUCKET", "");
        let err = CollectorConfig::from_environment(environment(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("INFLUXDB_BUCKET")));
    }

    #[test]
    fn test_non_positive_interval_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POLL_INTERVAL", "0"));
        let err = CollectorConfig::from_environment(environment(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "POLL_INTERVAL", .. }));
    }

    #[test]
    fn test_out_of_range_durations_rejected() {
        for (name, raw) in [
            ("POLL_INTERVAL", "1e30"),
            ("POLL_INTERVAL", "1e-12"),
            ("SINK_WRITE_TIMEOUT", "-2"),
            ("OBD_TIMEOUT", "1e-12"),
        ] {
            let mut pairs = REQUIRED.to_vec();
            pairs.push((name, raw));
            let err = CollectorConfig::from_environment(environment(&pairs)).unwrap_err();
            assert!(
                matches!(err, ConfigError::Invalid { name: n, .. } if n == name),
                "{}={} accepted",
                name,
                raw
            );
        }
    }
}
