//! # perle-printer
//!
//! Thermal ticket encoding and delivery for the La Perle Rouge point of
//! sale.
//!
//! ## Scope
//!
//! This crate handles HOW a ticket gets onto paper:
//! - ESC/POS command encoding (Windows-1252 text, Code 128 barcodes)
//! - Delivery through prioritized transports: direct device channel,
//!   host print service, manual-print fallback
//! - Sanitizing encoded buffers back to plain text for the fallback
//!
//! Business logic (WHAT to print) stays in application code: receipt and
//! report layout, order data, windows and dialogs.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use perle_printer::{
//!     DeliveryCoordinator, JobBuilder, SpoolFilePresenter, TcpChannelSource,
//! };
//!
//! // Build the ticket
//! let mut b = JobBuilder::new(32);
//! b.center();
//! b.bold();
//! b.line("LA PERLE ROUGE");
//! b.bold_off();
//! b.line_lr("TOTAL", "45.00 MAD");
//! b.barcode("CMD-0042");
//! b.feed(4);
//! b.cut();
//!
//! // Deliver it, falling back to a spool file if the printer is away
//! let source = Arc::new(TcpChannelSource::new("192.168.1.100", 9100)?);
//! let presenter = Arc::new(SpoolFilePresenter::new("spool"));
//! let coordinator = DeliveryCoordinator::new(source, presenter);
//! let outcome = coordinator.print(&b.build()).await?;
//! ```

mod channel;
mod coordinator;
mod encoding;
mod error;
mod escpos;
mod job;
mod sanitize;
mod transport;

// Re-exports
pub use channel::{ChannelSource, DEFAULT_BAUD_RATE, DeviceChannel, TcpChannel, TcpChannelSource};
pub use coordinator::{
    CoordinatorConfig, DEFAULT_COPY_DELAY, DeliveryCoordinator, DeliveryOutcome,
};
pub use encoding::{decode_text, encode_text, pad_text, text_width, truncate_text};
pub use error::{PrintError, PrintResult};
pub use escpos::{EncodedBuffer, MAX_BARCODE_PAYLOAD, cmd, encode};
pub use job::{
    Alignment, CutMode, Directive, Emphasis, JobBuilder, PrintJob, Scale, Symbology,
    format_currency, format_timestamp, rule,
};
pub use sanitize::strip_commands;
pub use transport::{
    AttemptOutcome, DeliveryAttempt, HostPrintOptions, HostPrintService, MarginMode,
    SpoolFilePresenter, TicketPresenter, TransportKind,
};

#[cfg(windows)]
pub use transport::WindowsHostService;
