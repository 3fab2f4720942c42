//! Delivery coordinator
//!
//! Takes encoded buffers and gets the bytes onto paper, degrading through
//! three transport tiers:
//!
//! 1. direct device channel (exact protocol bytes, physical cut)
//! 2. host print service (best-effort, may not honor control bytes)
//! 3. sanitized plain-text ticket presented for manual printing
//!
//! The coordinator owns the one piece of persistent state in the crate: the
//! cached device channel, reused across jobs and discarded on the first
//! transmission error.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use crate::channel::{ChannelSource, DEFAULT_BAUD_RATE, DeviceChannel};
use crate::error::{PrintError, PrintResult};
use crate::escpos::{self, EncodedBuffer};
use crate::job::PrintJob;
use crate::sanitize;
use crate::transport::{
    DeliveryAttempt, HostPrintOptions, HostPrintService, TicketPresenter, TransportKind,
};

/// Pause between the two physical outputs of a dual-copy job, so the
/// operator can tear off the first ticket before the second starts
pub const DEFAULT_COPY_DELAY: Duration = Duration::from_millis(1500);

/// Delivery settings
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Transmission rate requested at channel acquisition
    pub baud_rate: u32,
    /// Delay between customer and staff copies
    pub copy_delay: Duration,
    /// Options forwarded to the host print service
    pub host_options: HostPrintOptions,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            copy_delay: DEFAULT_COPY_DELAY,
            host_options: HostPrintOptions::default(),
        }
    }
}

/// How a buffer was delivered
///
/// Any `Ok` outcome means the operator got a ticket, possibly a degraded
/// one; `attempts` records what each tier did along the way.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryOutcome {
    pub via: TransportKind,
    pub attempts: Vec<DeliveryAttempt>,
}

impl DeliveryOutcome {
    /// Whether the exact protocol bytes reached the device
    pub fn is_exact(&self) -> bool {
        self.via == TransportKind::Direct
    }
}

/// Stateful delivery coordinator
///
/// Cheap to share behind an [`Arc`]; concurrent delivery calls serialize on
/// the cached channel, so two jobs can never interleave bytes on one
/// printer stream.
pub struct DeliveryCoordinator {
    source: Arc<dyn ChannelSource>,
    host: Option<Arc<dyn HostPrintService>>,
    presenter: Arc<dyn TicketPresenter>,
    channel: Mutex<Option<Box<dyn DeviceChannel>>>,
    config: CoordinatorConfig,
}

impl DeliveryCoordinator {
    /// Create a coordinator with no host print service tier
    pub fn new(source: Arc<dyn ChannelSource>, presenter: Arc<dyn TicketPresenter>) -> Self {
        Self {
            source,
            host: None,
            presenter,
            channel: Mutex::new(None),
            config: CoordinatorConfig::default(),
        }
    }

    /// Add the host print service tier
    pub fn with_host(mut self, host: Arc<dyn HostPrintService>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Encode and deliver a job.
    ///
    /// Encoding errors (oversized barcode payload) surface before any
    /// transport is touched.
    pub async fn print(&self, job: &PrintJob) -> PrintResult<DeliveryOutcome> {
        let buffer = escpos::encode(job)?;
        self.deliver(&buffer).await
    }

    /// Encode and deliver a customer/staff pair.
    pub async fn print_pair(
        &self,
        customer: &PrintJob,
        staff: &PrintJob,
    ) -> PrintResult<(DeliveryOutcome, DeliveryOutcome)> {
        // both copies must encode before the first one prints
        let customer = escpos::encode(customer)?;
        let staff = escpos::encode(staff)?;
        self.deliver_pair(&customer, &staff).await
    }

    /// Deliver one encoded buffer through the transport chain.
    #[instrument(skip(self, buffer), fields(bytes = buffer.len()))]
    pub async fn deliver(&self, buffer: &EncodedBuffer) -> PrintResult<DeliveryOutcome> {
        let mut attempts = Vec::new();

        match self.transmit_direct(buffer.as_bytes()).await {
            Ok(()) => {
                attempts.push(DeliveryAttempt::success(TransportKind::Direct));
                return Ok(DeliveryOutcome {
                    via: TransportKind::Direct,
                    attempts,
                });
            }
            Err(e) => {
                warn!(error = %e, "direct channel failed, trying host print service");
                attempts.push(DeliveryAttempt::failed(TransportKind::Direct, e.to_string()));
            }
        }

        match self.submit_to_host(buffer.as_bytes()).await {
            Ok(()) => {
                info!("delivered via host print service");
                attempts.push(DeliveryAttempt::success(TransportKind::HostService));
                // host-service success is terminal, no further fallback
                return Ok(DeliveryOutcome {
                    via: TransportKind::HostService,
                    attempts,
                });
            }
            Err(e) => {
                warn!(error = %e, "host print service failed, presenting ticket manually");
                attempts.push(DeliveryAttempt::failed(
                    TransportKind::HostService,
                    e.to_string(),
                ));
            }
        }

        let ticket = sanitize::strip_commands(buffer.as_bytes());
        match self.presenter.present(&ticket).await {
            Ok(()) => {
                info!("ticket presented for manual printing");
                attempts.push(DeliveryAttempt::success(TransportKind::ManualFallback));
                Ok(DeliveryOutcome {
                    via: TransportKind::ManualFallback,
                    attempts,
                })
            }
            Err(e) => {
                error!(error = %e, "all transports exhausted");
                Err(PrintError::Presentation(e.to_string()))
            }
        }
    }

    /// Deliver a customer/staff buffer pair.
    ///
    /// The first buffer completes its whole chain before the second starts,
    /// with [`CoordinatorConfig::copy_delay`] in between. The copies are not
    /// atomic as a pair: a first copy that degrades to the manual fallback
    /// does not stop the second from trying the full chain. Only a fatal
    /// presentation failure aborts.
    #[instrument(skip(self, customer, staff))]
    pub async fn deliver_pair(
        &self,
        customer: &EncodedBuffer,
        staff: &EncodedBuffer,
    ) -> PrintResult<(DeliveryOutcome, DeliveryOutcome)> {
        let first = self.deliver(customer).await?;
        info!(via = ?first.via, "customer copy delivered");

        tokio::time::sleep(self.config.copy_delay).await;

        let second = self.deliver(staff).await?;
        info!(via = ?second.via, "staff copy delivered");

        Ok((first, second))
    }

    /// Transmit over the cached direct channel, acquiring one if needed.
    ///
    /// Holds the channel lock for the whole attempt: concurrent jobs queue
    /// here, and a write failure invalidates the channel before the lock is
    /// released, so no caller ever sees a broken channel as open.
    async fn transmit_direct(&self, data: &[u8]) -> PrintResult<()> {
        let mut slot = self.channel.lock().await;

        if slot.as_ref().is_none_or(|c| !c.is_open()) {
            *slot = None;
            let channel = self.source.acquire(self.config.baud_rate).await?;
            info!(baud_rate = channel.baud_rate(), "device channel acquired");
            *slot = Some(channel);
        }

        let Some(channel) = slot.as_mut() else {
            return Err(PrintError::ChannelUnavailable(
                "no device channel bound".to_string(),
            ));
        };

        match channel.write(data).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // discard before anything else can observe the handle
                *slot = None;
                warn!(error = %e, "transmission failed, channel invalidated");
                Err(PrintError::Transmission(e.to_string()))
            }
        }
    }

    async fn submit_to_host(&self, data: &[u8]) -> PrintResult<()> {
        let Some(host) = &self.host else {
            return Err(PrintError::HostServiceUnavailable(
                "no host print service configured".to_string(),
            ));
        };
        host.submit(data, &self.config.host_options).await
    }
}
