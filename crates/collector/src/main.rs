//! OBD Telemetry Logger - Main Entry Point

use anyhow::Context;
use collector::{
    init_logging, Collector, CollectorConfig, GpsSettings, GpsSource, ObdSource, SinkWriter,
    DEFAULT_PARAMETERS,
};
use gps_receiver::{GpsError, GpsReceiver, MtkCommand, NmeaReceiver};
use influx_sink::InfluxClient;
use metrics_exporter_prometheus::PrometheusBuilder;
use obd_protocol::ObdClient;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{error, info, warn, Level};

/// Serial read timeout for the GPS port
const GPS_READ_TIMEOUT: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CollectorConfig::from_env();
    init_logging(config.as_ref().map_or(Level::INFO, |c| c.log_level))?;
    let config = config.context("Invalid configuration")?;

    info!("=== OBD Telemetry Logger v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = config.metrics_listen {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to start metrics exporter")?;
        info!("Serving metrics on {}", addr);
    }

    let client = ObdClient::connect(
        &config.obd.port,
        config.obd.baud_rate,
        config.obd.protocol,
        config.obd.timeout,
    )
    .await
    .with_context(|| format!("Failed to connect to OBD adapter on {}", config.obd.port))?;
    let mut obd = ObdSource::new(
        client,
        DEFAULT_PARAMETERS.to_vec(),
        config.obd.max_failed_ticks,
    );

    let sink = match InfluxClient::new(config.sink.clone()) {
        Ok(sink) => sink,
        Err(e) => {
            if let Err(close_err) = obd.release().await {
                warn!("Failed to close OBD adapter: {}", close_err);
            }
            return Err(e).context("Failed to create InfluxDB client");
        }
    };

    let mut collector: Collector<_, NmeaReceiver, _> = Collector::new(
        obd,
        SinkWriter::new(sink, config.write_timeout),
        config.poll_interval,
    );

    if let Some(settings) = &config.gps {
        match open_gps(settings).await {
            Ok(receiver) => {
                let gps = GpsSource::new(receiver, config.poll_interval, Instant::now());
                collector = collector.with_gps(gps);
            }
            Err(e) => {
                if let Err(release_err) = collector.release().await {
                    warn!("Cleanup after GPS failure: {}", release_err);
                }
                return Err(e).with_context(|| format!("Failed to open GPS on {}", settings.port));
            }
        }
    }

    collector.run(shutdown_signal()).await?;
    info!("Shutdown complete");
    Ok(())
}

/// Open the receiver and select RMC+GGA output at the configured rate
async fn open_gps(settings: &GpsSettings) -> Result<NmeaReceiver, GpsError> {
    let mut receiver = NmeaReceiver::open(&settings.port, settings.baud_rate, GPS_READ_TIMEOUT)?;
    let commands = [
        MtkCommand::OutputRmcGga,
        MtkCommand::UpdateRate(settings.update_interval),
    ];
    if let Err(e) = receiver.configure(&commands).await {
        if let Err(close_err) = receiver.close().await {
            warn!("Failed to close GPS port: {}", close_err);
        }
        return Err(e);
    }
    Ok(receiver)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Interrupted, shutting down"),
        Err(e) => {
            error!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await
        }
    }
}
