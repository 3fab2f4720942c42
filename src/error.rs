//! Error types for ticket encoding and delivery

use thiserror::Error;

/// Printing error types
///
/// The first five variants are the delivery taxonomy: the coordinator
/// catches each one locally and moves to the next transport tier. Only
/// `Presentation` survives to the caller, once every tier is exhausted.
#[derive(Debug, Error)]
pub enum PrintError {
    /// No device channel is authorized or the operator declined selection
    #[error("No device channel available: {0}")]
    ChannelUnavailable(String),

    /// A write on the direct channel failed mid-stream
    #[error("Transmission failed: {0}")]
    Transmission(String),

    /// The host print service is missing or rejected the job
    #[error("Host print service unavailable: {0}")]
    HostServiceUnavailable(String),

    /// Barcode payload exceeds the single-byte length field of the protocol
    #[error("Barcode payload too large: {len} bytes (max 255)")]
    PayloadTooLarge { len: usize },

    /// Even the manual fallback surface could not be created
    #[error("Could not present ticket for manual printing: {0}")]
    Presentation(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for the device
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Invalid transport configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl PrintError {
    /// Short operator-facing notification naming the physical cause.
    ///
    /// Shown instead of raw transport error text when a delivery call
    /// fails outright.
    pub fn operator_message(&self) -> &'static str {
        match self {
            PrintError::ChannelUnavailable(_) | PrintError::Transmission(_) => {
                "Printer connection problem. Check the printer cable and power, then try again."
            }
            PrintError::HostServiceUnavailable(_) => {
                "No system printer accepted the ticket. Check that a printer is installed."
            }
            PrintError::PayloadTooLarge { .. } => {
                "The ticket barcode is too long to print. Shorten the order reference."
            }
            PrintError::Presentation(_) => {
                "The ticket could not be printed or displayed. Restart the application."
            }
            PrintError::Io(_) | PrintError::Timeout(_) => {
                "The printer did not respond. Check the connection and try again."
            }
            PrintError::InvalidConfig(_) => {
                "Printer settings are invalid. Review the printer configuration."
            }
        }
    }
}

/// Result type for printing operations
pub type PrintResult<T> = Result<T, PrintError>;
