//! Windows-1252 encoding utilities for Western thermal printers
//!
//! Receipts carry French text (accented product names, MAD amounts), and the
//! target printers expect a single-byte Western character set. This module
//! provides:
//! - Converting UTF-8 ticket text to Windows-1252 bytes
//! - Decoding raw buffers back to text (for the manual-print fallback)
//! - Width/padding helpers used by two-column line layout

/// Encode ticket text to Windows-1252 bytes.
///
/// Characters outside the code page are substituted by the encoder rather
/// than dropped, so the printed line keeps its length.
pub fn encode_text(s: &str) -> Vec<u8> {
    let (cow, _, _) = encoding_rs::WINDOWS_1252.encode(s);
    cow.into_owned()
}

/// Decode Windows-1252 bytes back to a string.
pub fn decode_text(bytes: &[u8]) -> String {
    let (cow, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    cow.into_owned()
}

/// Get the printed byte width of a string.
///
/// Windows-1252 is single-byte, so width equals encoded length; keeping the
/// helper makes layout code independent of that assumption.
pub fn text_width(s: &str) -> usize {
    encode_text(s).len()
}

/// Truncate a string to fit within a printed byte width
pub fn truncate_text(s: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let char_len = text_width(&c.to_string());
        if width + char_len > max_width {
            break;
        }
        result.push(c);
        width += char_len;
    }
    result
}

/// Pad a string to a specific printed byte width
///
/// If the string is longer than the width, it will be truncated.
pub fn pad_text(s: &str, width: usize, align_right: bool) -> String {
    let current_width = text_width(s);
    if current_width >= width {
        return truncate_text(s, width);
    }
    let spaces = width - current_width;
    if align_right {
        format!("{}{}", " ".repeat(spaces), s)
    } else {
        format!("{}{}", s, " ".repeat(spaces))
    }
}
