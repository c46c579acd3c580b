//! OBD-II Client for ELM327 Adapters
//!
//! Provides async serial communication with OBD-II adapters.

use crate::elm327::{ElmReply, PROMPT};
use crate::error::ObdError;
use crate::pid::{Pid, PidResponse};
use crate::protocol::ObdProtocol;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

/// Default timeout for OBD commands
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Commands sent after the reset: echo off, linefeeds off, spaces on, headers off
const SETUP_COMMANDS: [&str; 4] = ["ATE0", "ATL0", "ATS1", "ATH0"];

/// OBD-II client for communicating with ELM327-compatible adapters
pub struct ObdClient<S = SerialStream> {
    /// Serial port device path (e.g., "/dev/ttyUSB0" or "COM3")
    device: String,
    /// Open transport, `None` once disconnected
    port: Option<S>,
    /// OBD protocol to use
    protocol: ObdProtocol,
    /// Command timeout
    timeout: Duration,
    /// Bytes received after the last prompt
    pending: Vec<u8>,
}

impl ObdClient<SerialStream> {
    /// Open the serial device and run the adapter handshake.
    ///
    /// Blocks until the adapter answers the reset and setup commands.
    pub async fn connect(
        device: &str,
        baud_rate: u32,
        protocol: ObdProtocol,
        timeout: Duration,
    ) -> Result<Self, ObdError> {
        info!("Opening OBD adapter on {} at {} baud", device, baud_rate);
        let port = tokio_serial::new(device, baud_rate)
            .timeout(timeout)
            .open_native_async()?;
        Self::with_transport(device, port, protocol, timeout).await
    }
}

impl<S> ObdClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already-open transport and initialize the adapter on it
    pub async fn with_transport(
        device: &str,
        port: S,
        protocol: ObdProtocol,
        timeout: Duration,
    ) -> Result<Self, ObdError> {
        let mut client = Self {
            device: device.to_string(),
            port: Some(port),
            protocol,
            timeout,
            pending: Vec::new(),
        };
        client.initialize().await?;
        Ok(client)
    }

    /// Initialize the ELM327 adapter
    async fn initialize(&mut self) -> Result<(), ObdError> {
        info!("Initializing OBD adapter on {}", self.device);

        let banner = self.command("ATZ").await.map_err(|e| match e {
            ObdError::Timeout(_) => ObdError::AdapterNotResponding,
            other => other,
        })?;
        info!("Adapter identified as {:?}", banner);

        for cmd in SETUP_COMMANDS {
            let reply = ElmReply::parse(&self.command(cmd).await?, cmd, None)?;
            if !reply.is_ok() {
                warn!("Adapter did not acknowledge {}: {:?}", cmd, reply);
            }
        }

        let cmd = self.protocol.to_elm_command();
        let reply = ElmReply::parse(&self.command(&cmd).await?, &cmd, None)?;
        if !reply.is_ok() {
            return Err(ObdError::UnsupportedProtocol(format!("{:?}", self.protocol)));
        }

        info!("OBD adapter initialized successfully");
        Ok(())
    }

    /// Send a raw command and return the text received before the prompt
    pub async fn command(&mut self, cmd: &str) -> Result<String, ObdError> {
        let port = self.port.as_mut().ok_or(ObdError::Disconnected)?;
        port.write_all(cmd.as_bytes()).await?;
        port.write_all(b"\r").await?;
        port.flush().await?;

        let timeout = self.timeout;
        match tokio::time::timeout(timeout, self.read_until_prompt()).await {
            Ok(reply) => reply,
            Err(_) => Err(ObdError::Timeout(timeout.as_millis() as u64)),
        }
    }

    async fn read_until_prompt(&mut self) -> Result<String, ObdError> {
        let port = self.port.as_mut().ok_or(ObdError::Disconnected)?;
        let mut chunk = [0u8; 128];
        loop {
            if let Some(end) = self.pending.iter().position(|b| *b == PROMPT) {
                let reply: Vec<u8> = self.pending.drain(..=end).collect();
                return Ok(String::from_utf8_lossy(&reply[..end]).into_owned());
            }
            let n = port.read(&mut chunk).await?;
            if n == 0 {
                return Err(ObdError::SerialError("adapter closed the port".to_string()));
            }
            self.pending.extend_from_slice(&chunk[..n]);
        }
    }

    /// Query a PID and return the decoded response.
    ///
    /// `Ok(None)` means the vehicle does not answer this PID right now.
    pub async fn query_pid(&mut self, pid: Pid) -> Result<Option<PidResponse>, ObdError> {
        let request = pid.request();
        debug!("Querying PID {:02X}", pid.as_hex());

        let mut raw = self.command(&request).await?;
        let reply = loop {
            match ElmReply::parse(&raw, &request, Some(pid)) {
                // A late answer to a query that timed out earlier is still
                // queued ahead of ours; skip it and take the next prompt.
                Err(ObdError::InvalidResponse(_)) if self.holds_prompt() => {
                    raw = self.next_reply().await?;
                }
                other => break other?,
            }
        };

        match reply {
            ElmReply::Data(bytes) => {
                let timestamp_ms = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_millis() as u64)
                    .unwrap_or(0);
                PidResponse::decode(pid, bytes, timestamp_ms).map(Some)
            }
            ElmReply::NoData | ElmReply::Unknown => {
                debug!("PID {:02X} not answered", pid.as_hex());
                Ok(None)
            }
            ElmReply::Text(text) => Err(ObdError::InvalidResponse(text)),
        }
    }

    fn holds_prompt(&self) -> bool {
        self.pending.contains(&PROMPT)
    }

    async fn next_reply(&mut self) -> Result<String, ObdError> {
        let timeout = self.timeout;
        tokio::time::timeout(timeout, self.read_until_prompt())
            .await
            .map_err(|_| ObdError::Timeout(timeout.as_millis() as u64))?
    }

    /// Check if client is connected
    pub fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    /// Disconnect from the OBD adapter. Safe to call more than once.
    pub async fn disconnect(&mut self) -> Result<(), ObdError> {
        if let Some(mut port) = self.port.take() {
            info!("Disconnecting OBD client from {}", self.device);
            port.shutdown().await?;
        }
        Ok(())
    }
}
