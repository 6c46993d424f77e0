//! Byte-to-text extraction: recover readable lines from arbitrary bytes.
//!
//! This is a heuristic, not a parser. Originals are never validated as any
//! particular format, so the extractor treats the upload as "text with
//! binary noise": it decodes lossily, blanks out everything that is not
//! printable ASCII, and drops lines that look like structural debris
//! (object numbers, `<< >>` dictionaries, stream markers made of digits and
//! slashes). Uncompressed text in PDFs, plain-text files, and the literal
//! strings of simple documents survive; compressed streams do not.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Lines made only of digits, whitespace and `< > / \` are noise.
static RE_NOISE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\d\s<>/\\]+$").unwrap());

/// Extract plain text lines from raw original-format bytes.
///
/// Total: never fails, never panics, and returns an empty string when
/// nothing survives the filters.
pub fn extract_text(bytes: &[u8]) -> String {
    let decoded = String::from_utf8_lossy(bytes);
    let printable: String = decoded.chars().map(keep_or_blank).collect();

    let lines: Vec<&str> = printable.split('\n').filter(|l| keep_line(l)).collect();
    debug!(
        "Extracted {} lines from {} bytes",
        lines.len(),
        bytes.len()
    );
    lines.join("\n")
}

/// Printable ASCII and `\n \r \t` pass; anything else becomes a space.
fn keep_or_blank(c: char) -> char {
    match c {
        '\n' | '\r' | '\t' | ' '..='~' => c,
        _ => ' ',
    }
}

fn keep_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !RE_NOISE_LINE.is_match(trimmed)
}
