//! ESC/POS command encoder
//!
//! Pure translation from a [`PrintJob`] to the byte stream the printer
//! understands. No I/O; the only state is the [`cmd`] table, which the
//! fallback sanitizer (`strip_commands`) reads as well so the two stay
//! directive-for-directive in sync.

use crate::encoding::encode_text;
use crate::error::{PrintError, PrintResult};
use crate::job::{Alignment, CutMode, Directive, Emphasis, PrintJob, Scale, Symbology};

/// Raw ESC/POS command bytes (RONGTA RP330 series dialect)
///
/// Shared by the encoder and the fallback sanitizer. A directive added to
/// the encoder gets its sequence here and a matching stripping rule in
/// the sanitizer.
pub mod cmd {
    /// ESC @ - Initialize printer
    pub const INIT: [u8; 2] = [0x1B, 0x40];
    /// ESC R 0 - International character set: USA
    pub const CHARSET_USA: [u8; 3] = [0x1B, 0x52, 0x00];
    /// ESC t 16 - Code page: WPC1252 (Western Europe)
    pub const CODEPAGE_WPC1252: [u8; 3] = [0x1B, 0x74, 0x10];

    /// ESC a n - Alignment
    pub const ALIGN_LEFT: [u8; 3] = [0x1B, 0x61, 0x00];
    pub const ALIGN_CENTER: [u8; 3] = [0x1B, 0x61, 0x01];
    pub const ALIGN_RIGHT: [u8; 3] = [0x1B, 0x61, 0x02];

    /// ESC E n - Emphasis
    pub const BOLD_ON: [u8; 3] = [0x1B, 0x45, 0x01];
    pub const BOLD_OFF: [u8; 3] = [0x1B, 0x45, 0x00];

    /// ESC ! n - Character scale
    pub const SCALE_NORMAL: [u8; 3] = [0x1B, 0x21, 0x00];
    pub const SCALE_DOUBLE_HEIGHT: [u8; 3] = [0x1B, 0x21, 0x10];
    pub const SCALE_DOUBLE_WIDTH: [u8; 3] = [0x1B, 0x21, 0x20];
    pub const SCALE_LARGE: [u8; 3] = [0x1B, 0x21, 0x30];

    /// ESC 3 n - Line spacing in dots (n follows)
    pub const LINE_SPACING: [u8; 2] = [0x1B, 0x33];

    /// GS V n - Paper cut
    pub const CUT_FULL: [u8; 3] = [0x1D, 0x56, 0x00];
    pub const CUT_PARTIAL: [u8; 3] = [0x1D, 0x56, 0x01];

    /// GS h n - Barcode height (n follows)
    pub const BARCODE_HEIGHT: [u8; 2] = [0x1D, 0x68];
    /// GS w n - Barcode module width (n follows)
    pub const BARCODE_WIDTH: [u8; 2] = [0x1D, 0x77];
    /// GS H n - Human-readable text position (n follows)
    pub const BARCODE_HRI: [u8; 2] = [0x1D, 0x48];
    /// GS k m len payload - Print barcode
    pub const BARCODE_PRINT: [u8; 2] = [0x1D, 0x6B];

    /// Symbology selector for Code 128
    pub const SYMBOLOGY_CODE128: u8 = 73;
    /// Default barcode height in dots
    pub const BARCODE_HEIGHT_DOTS: u8 = 50;
    /// Default barcode module width multiplier
    pub const BARCODE_WIDTH_MODULES: u8 = 2;
    /// Human-readable text below the barcode
    pub const HRI_BELOW: u8 = 2;

    pub const LF: u8 = 0x0A;
}

/// Largest barcode payload the protocol's single-byte length field carries
pub const MAX_BARCODE_PAYLOAD: usize = 255;

/// Opaque encoded print job, ready for transmission
///
/// Immutable once produced; contains control bytes outside printable ASCII.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBuffer(Vec<u8>);

impl EncodedBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for EncodedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Encode a print job into the device byte stream.
///
/// Every job opens with initialize and character-set selection, then each
/// directive's sequence in order. Oversized barcode payloads are rejected
/// before any bytes are produced, so a [`PrintError::PayloadTooLarge`] never
/// leaves a half-encoded buffer behind.
pub fn encode(job: &PrintJob) -> PrintResult<EncodedBuffer> {
    for directive in job.directives() {
        if let Directive::Barcode { payload, .. } = directive {
            let len = encode_text(payload).len();
            if len > MAX_BARCODE_PAYLOAD {
                return Err(PrintError::PayloadTooLarge { len });
            }
        }
    }

    let mut buf = Vec::with_capacity(4096);
    buf.extend_from_slice(&cmd::INIT);
    buf.extend_from_slice(&cmd::CHARSET_USA);
    buf.extend_from_slice(&cmd::CODEPAGE_WPC1252);

    for directive in job.directives() {
        encode_directive(directive, &mut buf);
    }

    Ok(EncodedBuffer(buf))
}

fn encode_directive(directive: &Directive, buf: &mut Vec<u8>) {
    match directive {
        Directive::SetAlignment { align } => {
            let seq = match align {
                Alignment::Left => &cmd::ALIGN_LEFT,
                Alignment::Center => &cmd::ALIGN_CENTER,
                Alignment::Right => &cmd::ALIGN_RIGHT,
            };
            buf.extend_from_slice(seq);
        }
        Directive::SetEmphasis { emphasis } => {
            let seq = match emphasis {
                Emphasis::Normal => &cmd::BOLD_OFF,
                Emphasis::Bold => &cmd::BOLD_ON,
            };
            buf.extend_from_slice(seq);
        }
        Directive::SetScale { scale } => {
            let seq = match scale {
                Scale::Normal => &cmd::SCALE_NORMAL,
                Scale::DoubleHeight => &cmd::SCALE_DOUBLE_HEIGHT,
                Scale::DoubleWidth => &cmd::SCALE_DOUBLE_WIDTH,
                Scale::Large => &cmd::SCALE_LARGE,
            };
            buf.extend_from_slice(seq);
        }
        Directive::SetLineSpacing { dots } => {
            buf.extend_from_slice(&cmd::LINE_SPACING);
            buf.push(*dots);
        }
        Directive::LineFeed { count } => {
            // count = 0 is a no-op
            buf.extend(std::iter::repeat_n(cmd::LF, *count as usize));
        }
        Directive::HorizontalRule { ch, width } => {
            // no terminator; width = 0 yields nothing
            if *width > 0 {
                let rule: String = std::iter::repeat_n(*ch, *width).collect();
                buf.extend_from_slice(&encode_text(&rule));
            }
        }
        Directive::CutPaper { mode } => {
            let seq = match mode {
                CutMode::Full => &cmd::CUT_FULL,
                CutMode::Partial => &cmd::CUT_PARTIAL,
            };
            buf.extend_from_slice(seq);
        }
        Directive::Barcode { payload, symbology } => {
            let selector = match symbology {
                Symbology::Code128 => cmd::SYMBOLOGY_CODE128,
            };
            let payload = encode_text(payload);
            buf.extend_from_slice(&cmd::BARCODE_HEIGHT);
            buf.push(cmd::BARCODE_HEIGHT_DOTS);
            buf.extend_from_slice(&cmd::BARCODE_WIDTH);
            buf.push(cmd::BARCODE_WIDTH_MODULES);
            buf.extend_from_slice(&cmd::BARCODE_HRI);
            buf.push(cmd::HRI_BELOW);
            buf.extend_from_slice(&cmd::BARCODE_PRINT);
            buf.push(selector);
            buf.push(payload.len() as u8);
            buf.extend_from_slice(&payload);
        }
        Directive::Literal { text } => {
            buf.extend_from_slice(&encode_text(text));
        }
    }
}
