//! Print job data model
//!
//! A [`PrintJob`] is an ordered list of [`Directive`]s: semantic formatting
//! instructions plus literal ticket text. The order-entry side builds jobs
//! (directly or through [`JobBuilder`]) and hands them to the encoder;
//! nothing here touches device bytes.

use chrono::{DateTime, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::encoding::text_width;

/// Horizontal alignment mode, persistent until changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Text emphasis mode, persistent until changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Normal,
    Bold,
}

/// Character scale mode, persistent until changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    Normal,
    DoubleHeight,
    DoubleWidth,
    Large,
}

/// Paper cut mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutMode {
    Full,
    Partial,
}

/// Barcode symbology
///
/// Only Code 128 is used on tickets; the enum keeps the wire selector
/// byte out of the data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Code128,
}

/// A single formatting or content instruction in a print job
///
/// Directives are applied in sequence. Alignment, emphasis, scale and line
/// spacing are modes that stay active until explicitly changed or the job
/// ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Directive {
    SetAlignment { align: Alignment },
    SetEmphasis { emphasis: Emphasis },
    SetScale { scale: Scale },
    SetLineSpacing { dots: u8 },
    LineFeed { count: u8 },
    HorizontalRule { ch: char, width: usize },
    CutPaper { mode: CutMode },
    Barcode { payload: String, symbology: Symbology },
    Literal { text: String },
}

/// An ordered sequence of directives, encoded as one buffer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    directives: Vec<Directive>,
}

impl PrintJob {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, directive: Directive) {
        self.directives.push(directive);
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }

    pub fn len(&self) -> usize {
        self.directives.len()
    }
}

impl From<Vec<Directive>> for PrintJob {
    fn from(directives: Vec<Directive>) -> Self {
        Self { directives }
    }
}

/// Fluent builder for print jobs
///
/// Tracks the paper width in characters so rules and two-column lines come
/// out at ticket width.
///
/// Common widths:
/// - 58mm paper: 32 characters
/// - 80mm paper: 48 characters
pub struct JobBuilder {
    job: PrintJob,
    width: usize,
}

impl JobBuilder {
    /// Create a builder for the given paper width in characters
    pub fn new(width: usize) -> Self {
        Self {
            job: PrintJob::new(),
            width,
        }
    }

    /// Get the configured paper width
    pub fn width(&self) -> usize {
        self.width
    }

    // === Text Output ===

    /// Write literal text without a terminator
    pub fn text(&mut self, s: &str) -> &mut Self {
        self.job.push(Directive::Literal {
            text: s.to_string(),
        });
        self
    }

    /// Write text followed by a line feed
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.newline()
    }

    /// Write a single line feed
    pub fn newline(&mut self) -> &mut Self {
        self.job.push(Directive::LineFeed { count: 1 });
        self
    }

    /// Feed multiple blank lines
    pub fn feed(&mut self, count: u8) -> &mut Self {
        self.job.push(Directive::LineFeed { count });
        self
    }

    // === Alignment ===

    pub fn center(&mut self) -> &mut Self {
        self.align(Alignment::Center)
    }

    pub fn left(&mut self) -> &mut Self {
        self.align(Alignment::Left)
    }

    pub fn right(&mut self) -> &mut Self {
        self.align(Alignment::Right)
    }

    pub fn align(&mut self, align: Alignment) -> &mut Self {
        self.job.push(Directive::SetAlignment { align });
        self
    }

    // === Text Style ===

    /// Enable bold text
    pub fn bold(&mut self) -> &mut Self {
        self.job.push(Directive::SetEmphasis {
            emphasis: Emphasis::Bold,
        });
        self
    }

    /// Disable bold text
    pub fn bold_off(&mut self) -> &mut Self {
        self.job.push(Directive::SetEmphasis {
            emphasis: Emphasis::Normal,
        });
        self
    }

    pub fn scale(&mut self, scale: Scale) -> &mut Self {
        self.job.push(Directive::SetScale { scale });
        self
    }

    /// Reset to normal character size
    pub fn reset_size(&mut self) -> &mut Self {
        self.scale(Scale::Normal)
    }

    /// Set line spacing in dots
    pub fn line_spacing(&mut self, dots: u8) -> &mut Self {
        self.job.push(Directive::SetLineSpacing { dots });
        self
    }

    // === Separators ===

    /// Full-width rule of the given character, followed by a line feed
    pub fn rule_line(&mut self, ch: char) -> &mut Self {
        self.job.push(Directive::HorizontalRule {
            ch,
            width: self.width,
        });
        self.newline()
    }

    /// Full-width '=' rule line
    pub fn sep_double(&mut self) -> &mut Self {
        self.rule_line('=')
    }

    /// Full-width '-' rule line
    pub fn sep_single(&mut self) -> &mut Self {
        self.rule_line('-')
    }

    // === Layout Helpers ===

    /// Print left and right text on the same line
    ///
    /// Left text is left-aligned, right text is right-aligned, with spaces
    /// filling the gap. Falls back to a single space when the texts do not
    /// fit on one line.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = text_width(left);
        let rw = text_width(right);

        if lw + rw >= self.width {
            self.line(&format!("{} {}", left, right))
        } else {
            let gap = self.width - lw - rw;
            self.line(&format!("{}{}{}", left, " ".repeat(gap), right))
        }
    }

    // === Barcode & Paper Control ===

    /// Print a Code 128 barcode for the given payload
    pub fn barcode(&mut self, payload: &str) -> &mut Self {
        self.job.push(Directive::Barcode {
            payload: payload.to_string(),
            symbology: Symbology::Code128,
        });
        self
    }

    /// Cut paper (full cut)
    pub fn cut(&mut self) -> &mut Self {
        self.job.push(Directive::CutPaper {
            mode: CutMode::Full,
        });
        self
    }

    /// Partial cut (leave a small connection)
    pub fn cut_partial(&mut self) -> &mut Self {
        self.job.push(Directive::CutPaper {
            mode: CutMode::Partial,
        });
        self
    }

    // === Build ===

    pub fn build(self) -> PrintJob {
        self.job
    }
}

impl Default for JobBuilder {
    fn default() -> Self {
        Self::new(32)
    }
}

// === Ticket text helpers ===

/// Fixed-width horizontal rule string, e.g. `rule('-', 32)`
///
/// For callers laying out literals themselves; width 0 yields an empty
/// string.
pub fn rule(ch: char, width: usize) -> String {
    std::iter::repeat_n(ch, width).collect()
}

/// Format an amount as printed on tickets, e.g. `45.00 MAD`
pub fn format_currency(amount: Decimal) -> String {
    format!("{:.2} MAD", amount)
}

/// Format a timestamp as printed on tickets, e.g. `04/08/2026 14:32`
pub fn format_timestamp<Tz: TimeZone>(when: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    when.format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::prelude::FromPrimitive;

    #[test]
    fn test_builder_order_preserved() {
        let mut b = JobBuilder::new(32);
        b.center().bold().line("TOTAL").bold_off().cut();
        let job = b.build();

        assert_eq!(job.len(), 6);
        assert_eq!(
            job.directives()[0],
            Directive::SetAlignment {
                align: Alignment::Center
            }
        );
        assert_eq!(
            job.directives()[5],
            Directive::CutPaper {
                mode: CutMode::Full
            }
        );
    }

    #[test]
    fn test_line_lr_fills_to_width() {
        let mut b = JobBuilder::new(20);
        b.line_lr("Café", "12.00 MAD");
        let job = b.build();

        match &job.directives()[0] {
            Directive::Literal { text } => {
                assert_eq!(text_width(text), 20);
                assert!(text.starts_with("Café"));
                assert!(text.ends_with("12.00 MAD"));
            }
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_line_lr_overflow_single_space() {
        let mut b = JobBuilder::new(10);
        b.line_lr("Jus d'orange", "24.00 MAD");
        let job = b.build();

        match &job.directives()[0] {
            Directive::Literal { text } => {
                assert_eq!(text, "Jus d'orange 24.00 MAD");
            }
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn test_rule() {
        let r = rule('-', 32);
        assert_eq!(r.len(), 32);
        assert!(r.chars().all(|c| c == '-'));
        assert_eq!(rule('=', 0), "");
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(Decimal::from_f64(45.0).unwrap()), "45.00 MAD");
        assert_eq!(format_currency(Decimal::from_f64(7.5).unwrap()), "7.50 MAD");
    }

    #[test]
    fn test_format_timestamp() {
        let when = Utc.with_ymd_and_hms(2026, 8, 4, 14, 32, 15).unwrap();
        assert_eq!(format_timestamp(&when), "04/08/2026 14:32");
    }

    #[test]
    fn test_job_serde_round_trip() {
        let mut b = JobBuilder::new(32);
        b.center().line("LA PERLE ROUGE").barcode("CMD-0042").cut();
        let job = b.build();

        let json = serde_json::to_string(&job).unwrap();
        let back: PrintJob = serde_json::from_str(&json).unwrap();
        assert_eq!(job, back);
    }
}
