//! Fallback sanitizer
//!
//! Strips every command sequence the encoder can produce, leaving the
//! printable ticket text for the manual-print surface. This is the inverse
//! of the encoder and reads the same `cmd` table: a directive added there
//! needs a stripping rule here.

use crate::encoding::decode_text;
use crate::escpos::cmd;

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;

/// Strip protocol control sequences from an encoded buffer.
///
/// Literal text and line breaks survive; everything else (initialize,
/// character set, alignment, emphasis, scale, line spacing, the barcode
/// block including its payload, cuts) is removed. Runs of three or more
/// blank lines collapse to a single blank line.
///
/// Accepts both encoder output (Windows-1252 bytes) and already-sanitized
/// UTF-8 text; the result carries no control bytes and no Windows-1252
/// bytes, so sanitizing twice is a no-op.
pub fn strip_commands(data: &[u8]) -> String {
    let mut text = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            ESC => i += esc_sequence_len(&data[i..]),
            GS => i += gs_sequence_len(&data[i..]),
            cmd::LF => {
                text.push(b);
                i += 1;
            }
            // residual control bytes never reach the operator
            b if b < 0x20 || b == 0x7F => i += 1,
            _ => {
                text.push(b);
                i += 1;
            }
        }
    }

    // already-valid UTF-8 means a prior pass decoded it; only raw
    // Windows-1252 bytes go through the code page
    let text = match String::from_utf8(text) {
        Ok(s) => s,
        Err(e) => decode_text(&e.into_bytes()),
    };
    collapse_blank_lines(&text)
}

/// Length of the ESC sequence starting at `seq[0]`
fn esc_sequence_len(seq: &[u8]) -> usize {
    let len = match seq.get(1) {
        // ESC @ - initialize
        Some(0x40) => 2,
        // ESC R, ESC t, ESC a, ESC E, ESC !, ESC 3 - one parameter byte
        Some(0x52) | Some(0x74) | Some(0x61) | Some(0x45) | Some(0x21) | Some(0x33) => 3,
        // unknown escape: drop the introducer and its parameter
        Some(_) => 2,
        None => 1,
    };
    len.min(seq.len())
}

/// Length of the GS sequence starting at `seq[0]`
fn gs_sequence_len(seq: &[u8]) -> usize {
    let len = match seq.get(1) {
        // GS V - cut, GS h/w/H - barcode parameters: one parameter byte
        Some(0x56) | Some(0x68) | Some(0x77) | Some(0x48) => 3,
        // GS k m len payload - the whole barcode block goes
        Some(0x6B) => match seq.get(3) {
            Some(&payload_len) => 4 + payload_len as usize,
            None => seq.len(),
        },
        Some(_) => 2,
        None => 1,
    };
    len.min(seq.len())
}

/// Collapse runs of three or more blank lines into one blank line
fn collapse_blank_lines(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut newlines = 0usize;

    for c in s.chars() {
        if c == '\n' {
            newlines += 1;
        } else {
            flush_newlines(&mut out, newlines);
            newlines = 0;
            out.push(c);
        }
    }
    flush_newlines(&mut out, newlines);
    out
}

fn flush_newlines(out: &mut String, count: usize) {
    // four newlines make three blank lines; cap the run at one blank line
    let emit = if count >= 4 { 2 } else { count };
    for _ in 0..emit {
        out.push('\n');
    }
}
