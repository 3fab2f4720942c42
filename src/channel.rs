//! Direct device channels
//!
//! A [`DeviceChannel`] is a bound, writable path to a physical printer. The
//! coordinator owns at most one at a time and reuses it across jobs, so
//! acquisition (an operator-mediated device selection) happens once, not per
//! ticket.
//!
//! [`TcpChannel`] covers the common case of thermal printers listening on
//! raw TCP port 9100. Serial adapters implement the same pair of traits in
//! the application shell, where the operator-facing device picker lives.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

use crate::error::{PrintError, PrintResult};

/// Transmission rate used when the operator has not configured one
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// A bound communication channel to a physical printer
///
/// Channels carry their open/closed state and a fixed transmission rate.
/// A channel that reports an error from [`write`](DeviceChannel::write) is
/// discarded by the coordinator, never retried.
#[async_trait]
pub trait DeviceChannel: Send {
    /// Whether the channel can still accept writes
    fn is_open(&self) -> bool;

    /// The fixed transmission rate the channel was opened with
    fn baud_rate(&self) -> u32;

    /// Transmit raw bytes, all or nothing for this attempt
    async fn write(&mut self, data: &[u8]) -> PrintResult<()>;

    /// Release the channel
    async fn close(&mut self) -> PrintResult<()>;
}

/// Operator-mediated channel acquisition
///
/// Implementations prompt for (or look up) the target device and open it.
/// Declined or impossible selection maps to
/// [`PrintError::ChannelUnavailable`]; the coordinator then falls back to
/// the next transport instead of failing the job.
#[async_trait]
pub trait ChannelSource: Send + Sync {
    async fn acquire(&self, baud_rate: u32) -> PrintResult<Box<dyn DeviceChannel>>;
}

/// Network printer channel (raw TCP, port 9100)
pub struct TcpChannel {
    addr: SocketAddr,
    baud_rate: u32,
    timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpChannel {
    /// Get the printer address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

#[async_trait]
impl DeviceChannel for TcpChannel {
    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    #[instrument(skip(self, data), fields(addr = %self.addr, data_len = data.len()))]
    async fn write(&mut self, data: &[u8]) -> PrintResult<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(PrintError::Transmission(format!(
                "channel to {} is closed",
                self.addr
            )));
        };

        let result = tokio::time::timeout(self.timeout, async {
            stream.write_all(data).await?;
            stream.flush().await
        })
        .await;

        match result {
            Ok(Ok(())) => {
                info!(bytes = data.len(), "transmitted");
                Ok(())
            }
            Ok(Err(e)) => {
                // a failed stream never accepts another write
                self.stream = None;
                Err(PrintError::Transmission(format!("{}: {}", self.addr, e)))
            }
            Err(_) => {
                self.stream = None;
                Err(PrintError::Transmission(format!(
                    "write timeout: {}",
                    self.addr
                )))
            }
        }
    }

    async fn close(&mut self) -> PrintResult<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}

/// Channel source for a configured network printer
///
/// Acquisition here needs no prompt: the device address was chosen once in
/// the printer settings, which stands in for the operator grant.
#[derive(Debug, Clone)]
pub struct TcpChannelSource {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpChannelSource {
    /// Create a source for the given printer host and port
    pub fn new(host: &str, port: u16) -> PrintResult<Self> {
        let addr_str = format!("{}:{}", host, port);
        let addr = addr_str
            .parse()
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr_str)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
        })
    }

    /// Create from a socket address string (e.g., "192.168.1.100:9100")
    pub fn from_addr(addr: &str) -> PrintResult<Self> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| PrintError::InvalidConfig(format!("Invalid address: {}", addr)))?;

        Ok(Self {
            addr,
            timeout: Duration::from_secs(5),
        })
    }

    /// Set connect/write timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl ChannelSource for TcpChannelSource {
    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn acquire(&self, baud_rate: u32) -> PrintResult<Box<dyn DeviceChannel>> {
        info!("Connecting to printer");

        let stream = match tokio::time::timeout(self.timeout, TcpStream::connect(self.addr)).await
        {
            Ok(Ok(s)) => s,
            Ok(Err(e)) => {
                warn!(error = %e, "Printer unreachable");
                return Err(PrintError::ChannelUnavailable(format!(
                    "{}: {}",
                    self.addr, e
                )));
            }
            Err(_) => {
                warn!("Printer connection timeout");
                return Err(PrintError::ChannelUnavailable(format!(
                    "connection timeout: {}",
                    self.addr
                )));
            }
        };

        Ok(Box::new(TcpChannel {
            addr: self.addr,
            baud_rate,
            timeout: self.timeout,
            stream: Some(stream),
        }))
    }
}
