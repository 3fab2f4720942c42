//! Fallback transports
//!
//! After the direct device channel, the coordinator tries the host print
//! service, then the manual-print surface. Both are seams: the application
//! shell wires platform implementations, the crate ships the common ones
//! (Windows RAW spooler, spool-file presenter).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{PrintError, PrintResult};

/// Which delivery mechanism carried (or tried to carry) a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Direct,
    HostService,
    ManualFallback,
}

/// Outcome of a single transport attempt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "result", content = "reason")]
pub enum AttemptOutcome {
    Success,
    Failed(String),
}

/// One transport's outcome for one buffer
///
/// Ephemeral: decides whether the next tier runs, then rides along on the
/// final outcome for logging. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryAttempt {
    pub transport: TransportKind,
    pub outcome: AttemptOutcome,
}

impl DeliveryAttempt {
    pub fn success(transport: TransportKind) -> Self {
        Self {
            transport,
            outcome: AttemptOutcome::Success,
        }
    }

    pub fn failed(transport: TransportKind, reason: impl Into<String>) -> Self {
        Self {
            transport,
            outcome: AttemptOutcome::Failed(reason.into()),
        }
    }
}

/// Margin handling for host-service printing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarginMode {
    Default,
    #[default]
    None,
    Minimum,
}

/// Options passed to the host print service with each job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostPrintOptions {
    /// Named device; `None` lets the service pick its default printer
    pub device: Option<String>,
    /// Print without a dialog
    pub silent: bool,
    pub margins: MarginMode,
    pub duplex: bool,
    pub copies: u32,
}

impl Default for HostPrintOptions {
    fn default() -> Self {
        Self {
            device: None,
            silent: true,
            margins: MarginMode::None,
            duplex: false,
            copies: 1,
        }
    }
}

/// Host-integrated system print service
///
/// Receives the encoded buffer as-is; services that cannot pass raw control
/// bytes through render a best-effort approximation. Rejection or absence
/// maps to [`PrintError::HostServiceUnavailable`].
#[async_trait]
pub trait HostPrintService: Send + Sync {
    async fn submit(&self, data: &[u8], options: &HostPrintOptions) -> PrintResult<()>;
}

/// Manual-print surface of last resort
///
/// Shows (or stores) a sanitized, plain-text ticket so the operator can
/// trigger printing by hand. Failure here maps to
/// [`PrintError::Presentation`] and is the only error a delivery call
/// surfaces to its caller.
#[async_trait]
pub trait TicketPresenter: Send + Sync {
    async fn present(&self, ticket: &str) -> PrintResult<()>;
}

/// Presenter that drops sanitized tickets into a spool directory
///
/// The operator prints the file from any text-capable printer. File names
/// carry a millisecond timestamp so consecutive tickets never collide.
pub struct SpoolFilePresenter {
    dir: PathBuf,
}

impl SpoolFilePresenter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl TicketPresenter for SpoolFilePresenter {
    #[instrument(skip(self, ticket), fields(dir = %self.dir.display()))]
    async fn present(&self, ticket: &str) -> PrintResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PrintError::Presentation(format!("{}: {}", self.dir.display(), e)))?;

        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S%3f");
        let path = self.dir.join(format!("ticket_{}.txt", stamp));

        tokio::fs::write(&path, ticket)
            .await
            .map_err(|e| PrintError::Presentation(format!("{}: {}", path.display(), e)))?;

        info!(path = %path.display(), "ticket spooled for manual printing");
        Ok(())
    }
}

/// Host print service backed by the Windows spooler
///
/// Submits the buffer as a RAW document, so control bytes reach printers
/// whose driver passes RAW through; others print the text approximation
/// their driver produces.
#[cfg(windows)]
pub struct WindowsHostService;

#[cfg(windows)]
impl WindowsHostService {
    /// List installed printers
    pub fn list() -> PrintResult<Vec<String>> {
        use windows::Win32::Graphics::Printing::{
            EnumPrintersW, PRINTER_ENUM_CONNECTIONS, PRINTER_ENUM_LOCAL, PRINTER_INFO_4W,
        };
        use windows::core::PWSTR;

        unsafe {
            let flags = PRINTER_ENUM_LOCAL | PRINTER_ENUM_CONNECTIONS;
            let mut needed: u32 = 0;
            let mut returned: u32 = 0;

            let _ = EnumPrintersW(flags, None, 4, None, &mut needed, &mut returned);
            if needed == 0 {
                return Ok(Vec::new());
            }

            let mut buf: Vec<u8> = vec![0; needed as usize];
            EnumPrintersW(
                flags,
                None,
                4,
                Some(buf.as_mut_slice()),
                &mut needed,
                &mut returned,
            )
            .map_err(|_| {
                PrintError::HostServiceUnavailable("EnumPrintersW failed".to_string())
            })?;

            let ptr = buf.as_ptr() as *const PRINTER_INFO_4W;
            let slice = std::slice::from_raw_parts(ptr, returned as usize);

            Ok(slice
                .iter()
                .filter(|info| !info.pPrinterName.is_null())
                .map(|info| PWSTR(info.pPrinterName.0).to_string().unwrap_or_default())
                .collect())
        }
    }

    /// Default printer name, if the system has one
    pub fn default_device() -> PrintResult<Option<String>> {
        use windows::Win32::Graphics::Printing::GetDefaultPrinterW;
        use windows::core::PWSTR;

        unsafe {
            let mut needed: u32 = 0;
            let _ = GetDefaultPrinterW(None, &mut needed);
            if needed == 0 {
                return Ok(None);
            }

            let mut buf: Vec<u16> = vec![0; needed as usize];
            if !GetDefaultPrinterW(Some(PWSTR(buf.as_mut_ptr())), &mut needed).as_bool() {
                return Ok(None);
            }

            let name = PWSTR(buf.as_mut_ptr()).to_string().map_err(|e| {
                PrintError::HostServiceUnavailable(format!("UTF-16 decode failed: {}", e))
            })?;
            Ok(Some(name))
        }
    }

    fn resolve_device(&self, options: &HostPrintOptions) -> PrintResult<String> {
        if let Some(device) = &options.device {
            return Ok(device.clone());
        }
        match Self::default_device()? {
            Some(name) => Ok(name),
            None => Self::list()?.into_iter().next().ok_or_else(|| {
                PrintError::HostServiceUnavailable("No printers installed".to_string())
            }),
        }
    }

    fn spool_raw(device: &str, data: &[u8]) -> PrintResult<()> {
        use core::ffi::c_void;
        use windows::Win32::Graphics::Printing::{
            ClosePrinter, DOC_INFO_1W, EndDocPrinter, EndPagePrinter, OpenPrinterW,
            PRINTER_HANDLE, StartDocPrinterW, StartPagePrinter, WritePrinter,
        };
        use windows::core::{PCWSTR, PWSTR};

        fn to_wide(s: &str) -> Vec<u16> {
            s.encode_utf16().chain(std::iter::once(0)).collect()
        }

        unsafe {
            let mut handle: PRINTER_HANDLE = PRINTER_HANDLE::default();
            let name_w = to_wide(device);

            OpenPrinterW(PCWSTR::from_raw(name_w.as_ptr()), &mut handle, None).map_err(|_| {
                PrintError::HostServiceUnavailable(format!("OpenPrinterW failed: {}", device))
            })?;

            let doc_name_w = to_wide("Ticket");
            let datatype_w = to_wide("RAW");
            let doc_info = DOC_INFO_1W {
                pDocName: PWSTR(doc_name_w.as_ptr() as *mut _),
                pOutputFile: PWSTR::null(),
                pDatatype: PWSTR(datatype_w.as_ptr() as *mut _),
            };

            if StartDocPrinterW(handle, 1, &doc_info as *const DOC_INFO_1W) == 0 {
                let _ = ClosePrinter(handle);
                return Err(PrintError::HostServiceUnavailable(
                    "StartDocPrinter failed".to_string(),
                ));
            }

            if !StartPagePrinter(handle).as_bool() {
                let _ = EndDocPrinter(handle);
                let _ = ClosePrinter(handle);
                return Err(PrintError::HostServiceUnavailable(
                    "StartPagePrinter failed".to_string(),
                ));
            }

            let mut written: u32 = 0;
            let ok = WritePrinter(
                handle,
                data.as_ptr() as *const c_void,
                data.len() as u32,
                &mut written,
            );

            let _ = EndPagePrinter(handle);
            let _ = EndDocPrinter(handle);
            let _ = ClosePrinter(handle);

            if !ok.as_bool() || written != data.len() as u32 {
                return Err(PrintError::HostServiceUnavailable(
                    "WritePrinter failed".to_string(),
                ));
            }
            Ok(())
        }
    }
}

#[cfg(windows)]
#[async_trait]
impl HostPrintService for WindowsHostService {
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    async fn submit(&self, data: &[u8], options: &HostPrintOptions) -> PrintResult<()> {
        let device = self.resolve_device(options)?;
        let data = data.to_vec();
        let copies = options.copies.max(1);

        // the spooler API is synchronous
        tokio::task::spawn_blocking(move || {
            for _ in 0..copies {
                Self::spool_raw(&device, &data)?;
            }
            Ok(())
        })
        .await
        .map_err(|e| PrintError::HostServiceUnavailable(format!("Task join failed: {}", e)))?
    }
}
