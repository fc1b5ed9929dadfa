//! Incremental header-line classification.
//!
//! The transport engine delivers response headers one terminated line at a
//! time. Each line is classified as a header field, the status line, or the
//! end-of-headers marker:
//!
//! | Line shape | Classification |
//! |------------|----------------|
//! | contains `:` | [`HeaderEvent::Field`] - stored raw, matched by key later |
//! | `PROTOCOL SP digits SP ...`, code in 100..=999 | [`HeaderEvent::Status`] |
//! | anything else (notably the empty line) | [`HeaderEvent::End`] |
//!
//! Malformed lines degrade gracefully - a bad status token leaves the status
//! pending, an unparseable field is dropped - partial information is still
//! useful to the caller.

// ============================================================================
// Imports
// ============================================================================

use tracing::trace;

// ============================================================================
// HeaderEvent
// ============================================================================

/// Classification of one received header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderEvent {
    /// A `"Key: value"` header field, trimmed of surrounding whitespace.
    Field(String),
    /// The status line; carries the parsed status code.
    Status(u16),
    /// End of headers (the blank line, or any line matching nothing else).
    End,
}

// ============================================================================
// Classification
// ============================================================================

/// Classifies one header line.
///
/// The line must already be terminated by the engine; a trailing CRLF is
/// tolerated and stripped along with any other surrounding whitespace.
#[must_use]
pub fn classify(line: &[u8]) -> HeaderEvent {
    let trimmed = line.trim_ascii();
    if trimmed.is_empty() {
        return HeaderEvent::End;
    }

    if trimmed.contains(&b':') {
        // Header fields are stored as text. Non-UTF-8 bytes are replaced
        // rather than failing the whole exchange.
        if let Err(e) = std::str::from_utf8(trimmed) {
            trace!(error = %e, "header line is not valid UTF-8");
        }
        return HeaderEvent::Field(String::from_utf8_lossy(trimmed).into_owned());
    }

    match parse_status_line(trimmed) {
        Some(code) => HeaderEvent::Status(code),
        None => HeaderEvent::End,
    }
}

/// Parses `PROTOCOL SP STATUS SP ...`, accepting the middle token only if
/// every character is a decimal digit and the value is in 100..=999.
fn parse_status_line(line: &[u8]) -> Option<u16> {
    let mut tokens = line.split(|b| b.is_ascii_whitespace()).filter(|t| !t.is_empty());
    let _protocol = tokens.next()?;
    let status = tokens.next()?;
    if !status.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let code: u32 = std::str::from_utf8(status).ok()?.parse().ok()?;
    (100..=999).contains(&code).then_some(code as u16)
}

// ============================================================================
// Header Lookup
// ============================================================================

/// Returns the value of `header` if its key matches `key`.
///
/// The match is ASCII case-insensitive and exact: the header must start with
/// the full key immediately followed by a colon, so looking up `"Content"`
/// never matches a `"Content-Type: ..."` header. The returned value has
/// leading whitespace stripped.
#[must_use]
pub fn header_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let (head, tail) = header.split_at_checked(key.len())?;
    if !head.eq_ignore_ascii_case(key) {
        return None;
    }
    let value = tail.strip_prefix(':')?;
    Some(value.trim_start())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_field() {
        assert_eq!(
            classify(b"Content-Type: text/plain\r\n"),
            HeaderEvent::Field("Content-Type: text/plain".to_string())
        );
    }

    #[test]
    fn test_classify_status_line() {
        assert_eq!(classify(b"HTTP/1.1 200 OK\r\n"), HeaderEvent::Status(200));
        assert_eq!(classify(b"HTTP/2 301\r\n"), HeaderEvent::Status(301));
    }

    #[test]
    fn test_classify_blank_is_end() {
        assert_eq!(classify(b"\r\n"), HeaderEvent::End);
        assert_eq!(classify(b""), HeaderEvent::End);
        assert_eq!(classify(b"   "), HeaderEvent::End);
    }

    #[test]
    fn test_status_token_must_be_all_digits() {
        assert_eq!(classify(b"HTTP/1.1 2x0 OK"), HeaderEvent::End);
        assert_eq!(classify(b"HTTP/1.1 20a"), HeaderEvent::End);
    }

    #[test]
    fn test_status_range_bounds() {
        assert_eq!(classify(b"HTTP/1.1 100 Continue"), HeaderEvent::Status(100));
        assert_eq!(classify(b"HTTP/1.1 999 Weird"), HeaderEvent::Status(999));
        assert_eq!(classify(b"HTTP/1.1 99 Low"), HeaderEvent::End);
        assert_eq!(classify(b"HTTP/1.1 1000 High"), HeaderEvent::End);
    }

    #[test]
    fn test_status_line_without_reason_phrase() {
        assert_eq!(classify(b"HTTP/1.1 204"), HeaderEvent::Status(204));
    }

    #[test]
    fn test_lone_token_is_end() {
        assert_eq!(classify(b"HTTP/1.1"), HeaderEvent::End);
    }

    #[test]
    fn test_header_value_case_insensitive() {
        let header = "Content-Type: text/plain";
        assert_eq!(header_value(header, "content-type"), Some("text/plain"));
        assert_eq!(header_value(header, "CONTENT-TYPE"), Some("text/plain"));
    }

    #[test]
    fn test_header_value_requires_exact_key() {
        let header = "Content-Type: text/plain";
        assert_eq!(header_value(header, "Content"), None);
        assert_eq!(header_value(header, "Content-Type-2"), None);
    }

    #[test]
    fn test_header_value_strips_leading_whitespace_only() {
        assert_eq!(header_value("X-Pad:    spaced  ", "x-pad"), Some("spaced  "));
        assert_eq!(header_value("X-Pad:", "x-pad"), Some(""));
    }

    #[test]
    fn test_header_value_key_longer_than_header() {
        assert_eq!(header_value("X:1", "X-Very-Long-Key"), None);
    }
}
