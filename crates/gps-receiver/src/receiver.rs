//! Serial NMEA receiver

use crate::command::MtkCommand;
use crate::error::GpsError;
use crate::fix::{FixState, SentenceDecoder};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Current-fix view of a GPS receiver
#[allow(async_fn_in_trait)]
pub trait GpsReceiver {
    /// Take the newest fix without blocking; returns 1 when it changed since
    /// the last call and 0 otherwise
    fn update(&mut self) -> Result<usize, GpsError>;

    /// Whether the receiver currently reports a fix
    fn has_fix(&self) -> bool;

    /// Latitude in degrees
    fn latitude(&self) -> Option<f64>;

    /// Longitude in degrees
    fn longitude(&self) -> Option<f64>;

    /// Altitude above mean sea level in meters
    fn altitude_m(&self) -> Option<f64>;

    /// Course over ground in degrees
    fn track_angle_deg(&self) -> Option<f64>;

    /// Release the serial handle. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), GpsError>;
}

/// NMEA receiver fed by a background reader task.
///
/// The reader decodes every sentence as it arrives and publishes only the
/// latest fix, so a slow consumer never sees an older position than the
/// stream has already reported.
pub struct NmeaReceiver {
    device: String,
    fixes: watch::Receiver<FixState>,
    writer: Option<Box<dyn AsyncWrite + Send + Unpin>>,
    reader: Option<JoinHandle<()>>,
    state: FixState,
}

impl NmeaReceiver {
    /// Open a serial device at the given baud rate
    pub fn open(device: &str, baud_rate: u32, timeout: Duration) -> Result<Self, GpsError> {
        info!("Opening GPS receiver on {} at {} baud", device, baud_rate);
        let port = tokio_serial::new(device, baud_rate)
            .timeout(timeout)
            .open_native_async()?;
        Ok(Self::from_stream(device, port))
    }

    /// Start reading sentences from an already-open stream.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_stream<S>(device: &str, stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (tx, rx) = watch::channel(FixState::default());
        let reader = tokio::spawn(read_sentences(device.to_string(), read_half, tx));

        Self {
            device: device.to_string(),
            fixes: rx,
            writer: Some(Box::new(write_half)),
            reader: Some(reader),
            state: FixState::default(),
        }
    }

    /// Write raw bytes to the receiver
    pub async fn send_command(&mut self, command: &[u8]) -> Result<(), GpsError> {
        let writer = self.writer.as_mut().ok_or(GpsError::Closed)?;
        writer.write_all(command).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Send each MTK command in order
    pub async fn configure(&mut self, commands: &[MtkCommand]) -> Result<(), GpsError> {
        for command in commands {
            debug!("Sending {:?} to {}", command, self.device);
            self.send_command(&command.to_bytes()?).await?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.writer.is_none()
    }
}

/// Decode the stream line by line and publish the fix after every sentence
/// that touched it. A partial line survives read timeouts.
async fn read_sentences<R>(device: String, read_half: R, tx: watch::Sender<FixState>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(read_half);
    let mut decoder = SentenceDecoder::new();
    let mut line = Vec::with_capacity(128);
    loop {
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => {
                warn!("GPS stream on {} ended", device);
                break;
            }
            Ok(_) => {
                let applied = decoder.feed(&line);
                line.clear();
                if applied > 0 {
                    tx.send_replace(*decoder.state());
                }
                if tx.is_closed() {
                    break;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => {
                warn!("GPS read error on {}: {}", device, e);
                break;
            }
        }
    }
}

impl GpsReceiver for NmeaReceiver {
    fn update(&mut self) -> Result<usize, GpsError> {
        if self.is_closed() {
            return Err(GpsError::Closed);
        }
        match self.fixes.has_changed() {
            Ok(false) => Ok(0),
            Ok(true) => {
                self.state = *self.fixes.borrow_and_update();
                Ok(1)
            }
            Err(_) => {
                // Reader is gone; hand out its last fix once before failing
                let last = *self.fixes.borrow();
                if last == self.state {
                    return Err(GpsError::StreamClosed);
                }
                self.state = last;
                Ok(1)
            }
        }
    }

    fn has_fix(&self) -> bool {
        self.state.has_fix
    }

    fn latitude(&self) -> Option<f64> {
        self.state.latitude
    }

    fn longitude(&self) -> Option<f64> {
        self.state.longitude
    }

    fn altitude_m(&self) -> Option<f64> {
        self.state.altitude_m
    }

    fn track_angle_deg(&self) -> Option<f64> {
        self.state.track_angle_deg
    }

    async fn close(&mut self) -> Result<(), GpsError> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(mut writer) = self.writer.take() {
            info!("Closing GPS receiver on {}", self.device);
            writer.shutdown().await?;
        }
        Ok(())
    }
}

impl Drop for NmeaReceiver {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}
