//! Streaming content-transfer encoders.
//!
//! Each encoder accepts input in arbitrarily sized chunks through
//! [`StreamEncoder::feed`] and carries partial encoding units between calls;
//! [`StreamEncoder::finish`] flushes whatever is still pending.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Default line separator.
pub const CRLF: &[u8] = b"\r\n";

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A chunk-at-a-time byte transform.
pub trait StreamEncoder {
    /// Encodes `input`, appending any output that is ready to `out`.
    fn feed(&mut self, input: &[u8], out: &mut Vec<u8>);

    /// Flushes pending state to `out`. The encoder must not be fed again.
    fn finish(&mut self, out: &mut Vec<u8>);
}

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Streaming Base64 encoder with optional line wrapping.
///
/// At most two input bytes are held back between [`feed`](StreamEncoder::feed)
/// calls. The output column is tracked across calls, so every line except
/// the last is exactly `max_line_length` characters long regardless of how
/// the input was chunked.
#[derive(Debug, Clone)]
pub struct Base64Encoder {
    remainder: Vec<u8>,
    column: usize,
    max_line_length: Option<usize>,
    line_separator: Vec<u8>,
}

impl Base64Encoder {
    /// Creates an encoder wrapping lines at `max_line_length` characters,
    /// or not at all when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `max_line_length` is zero.
    pub fn new(max_line_length: Option<usize>) -> Result<Self> {
        if max_line_length == Some(0) {
            return Err(Error::Configuration(
                "Base64 line length must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            remainder: Vec::with_capacity(3),
            column: 0,
            max_line_length,
            line_separator: CRLF.to_vec(),
        })
    }

    /// Replaces the CRLF line separator.
    #[must_use]
    pub fn with_line_separator(mut self, separator: impl Into<Vec<u8>>) -> Self {
        self.line_separator = separator.into();
        self
    }

    fn write_encoded(&mut self, data: &[u8], out: &mut Vec<u8>) {
        if data.is_empty() {
            return;
        }
        let encoded = STANDARD.encode(data);
        self.write_wrapped(encoded.as_bytes(), out);
    }

    fn write_wrapped(&mut self, text: &[u8], out: &mut Vec<u8>) {
        let Some(max) = self.max_line_length else {
            out.extend_from_slice(text);
            return;
        };

        let mut rest = text;
        while !rest.is_empty() {
            let take = (max - self.column).min(rest.len());
            out.extend_from_slice(&rest[..take]);
            self.column += take;
            rest = &rest[take..];

            if self.column == max {
                out.extend_from_slice(&self.line_separator);
                self.column = 0;
            }
        }
    }
}

impl StreamEncoder for Base64Encoder {
    fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) {
        let mut input = input;

        // Complete the held-back group first.
        if !self.remainder.is_empty() {
            let take = (3 - self.remainder.len()).min(input.len());
            self.remainder.extend_from_slice(&input[..take]);
            input = &input[take..];
            if self.remainder.len() < 3 {
                return;
            }
            let group = std::mem::take(&mut self.remainder);
            self.write_encoded(&group, out);
        }

        let usable = input.len() - input.len() % 3;
        self.write_encoded(&input[..usable], out);
        self.remainder.extend_from_slice(&input[usable..]);
    }

    fn finish(&mut self, out: &mut Vec<u8>) {
        let tail = std::mem::take(&mut self.remainder);
        self.write_encoded(&tail, out);

        if self.max_line_length.is_some() && self.column > 0 {
            out.extend_from_slice(&self.line_separator);
            self.column = 0;
        }
    }
}

/// Streaming Quoted-Printable encoder (RFC 2045 section 6.7).
///
/// Input CRLF pairs become hard line breaks. Bare CR and LF, `=`, control
/// and 8-bit bytes are written as `=XX`. Spaces and tabs are escaped when
/// they would end a line. Soft breaks keep every line within
/// `max_line_length` characters, the trailing `=` included.
#[derive(Debug, Clone)]
pub struct QuotedPrintableEncoder {
    max_line_length: usize,
    column: usize,
    pending_whitespace: Option<u8>,
    pending_cr: bool,
}

impl QuotedPrintableEncoder {
    /// Creates an encoder with the given line limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the limit cannot hold an escape
    /// sequence plus a soft break (less than 4).
    pub fn new(max_line_length: usize) -> Result<Self> {
        if max_line_length < 4 {
            return Err(Error::Configuration(format!(
                "Quoted-Printable line length must be at least 4, got {max_line_length}"
            )));
        }
        Ok(Self {
            max_line_length,
            column: 0,
            pending_whitespace: None,
            pending_cr: false,
        })
    }

    fn push_byte(&mut self, byte: u8, out: &mut Vec<u8>) {
        if self.pending_cr {
            self.pending_cr = false;
            if byte == b'\n' {
                out.extend_from_slice(CRLF);
                self.column = 0;
                return;
            }
            self.write_escaped(b'\r', out);
        }

        match byte {
            b'\r' => {
                self.flush_whitespace(true, out);
                self.pending_cr = true;
            }
            b' ' | b'\t' => {
                self.flush_whitespace(false, out);
                self.pending_whitespace = Some(byte);
            }
            b'!'..=b'<' | b'>'..=b'~' => {
                self.flush_whitespace(false, out);
                self.write_token(&[byte], out);
            }
            _ => {
                self.flush_whitespace(false, out);
                self.write_escaped(byte, out);
            }
        }
    }

    fn flush_whitespace(&mut self, escape: bool, out: &mut Vec<u8>) {
        if let Some(byte) = self.pending_whitespace.take() {
            if escape {
                self.write_escaped(byte, out);
            } else {
                self.write_token(&[byte], out);
            }
        }
    }

    fn write_escaped(&mut self, byte: u8, out: &mut Vec<u8>) {
        let token = [
            b'=',
            HEX_DIGITS[usize::from(byte >> 4)],
            HEX_DIGITS[usize::from(byte & 0x0F)],
        ];
        self.write_token(&token, out);
    }

    fn write_token(&mut self, token: &[u8], out: &mut Vec<u8>) {
        // One column stays free for the soft-break `=`.
        if self.column + token.len() > self.max_line_length - 1 {
            out.extend_from_slice(b"=\r\n");
            self.column = 0;
        }
        out.extend_from_slice(token);
        self.column += token.len();
    }
}

impl StreamEncoder for QuotedPrintableEncoder {
    fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) {
        for &byte in input {
            self.push_byte(byte, out);
        }
    }

    fn finish(&mut self, out: &mut Vec<u8>) {
        self.flush_whitespace(true, out);
        if self.pending_cr {
            self.pending_cr = false;
            self.write_escaped(b'\r', out);
        }
    }
}

/// Pass-through encoder for `7bit`, `8bit` and `binary` bodies.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityEncoder;

impl StreamEncoder for IdentityEncoder {
    fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) {
        out.extend_from_slice(input);
    }

    fn finish(&mut self, _out: &mut Vec<u8>) {}
}

/// Encodes bytes using Quoted-Printable in one call.
///
/// # Errors
///
/// Returns an error if `max_line_length` is less than 4.
pub fn encode_quoted_printable(data: &[u8], max_line_length: usize) -> Result<String> {
    let mut encoder = QuotedPrintableEncoder::new(max_line_length)?;
    let mut out = Vec::with_capacity(data.len() + data.len() / 2);
    encoder.feed(data, &mut out);
    encoder.finish(&mut out);
    // The encoder only ever writes ASCII.
    Ok(out.into_iter().map(char::from).collect())
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_quoted_printable(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'=' {
            result.push(bytes[i]);
            i += 1;
            continue;
        }

        // Soft line break
        if bytes[i + 1..].starts_with(b"\r\n") {
            i += 3;
            continue;
        }
        if bytes[i + 1..].starts_with(b"\n") {
            i += 2;
            continue;
        }

        // Hex encoded byte
        let hex = bytes
            .get(i + 1..i + 3)
            .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".to_string()))?;
        let hex = std::str::from_utf8(hex)
            .map_err(|_| Error::InvalidEncoding("Invalid hex".to_string()))?;
        let byte = u8::from_str_radix(hex, 16)
            .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
        result.push(byte);
        i += 3;
    }

    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode_chunked(encoder: &mut impl StreamEncoder, data: &[u8], sizes: &[usize]) -> Vec<u8> {
        let mut out = Vec::new();
        let mut rest = data;
        let mut sizes = sizes.iter().cycle();
        while !rest.is_empty() {
            let size = sizes.next().copied().unwrap_or(rest.len()).min(rest.len());
            encoder.feed(&rest[..size], &mut out);
            rest = &rest[size..];
        }
        encoder.finish(&mut out);
        out
    }

    fn strip_crlf(data: &[u8]) -> String {
        String::from_utf8(data.to_vec()).unwrap().replace("\r\n", "")
    }

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_base64_stream_unwrapped() {
        let mut encoder = Base64Encoder::new(None).unwrap();
        let out = encode_chunked(&mut encoder, b"Hello, World!", &[1, 2, 5]);
        assert_eq!(out, b"SGVsbG8sIFdvcmxkIQ==");
    }

    #[test]
    fn test_base64_stream_wrapped() {
        let mut encoder = Base64Encoder::new(Some(8)).unwrap();
        let out = encode_chunked(&mut encoder, b"Hello, World!", &[4]);
        assert_eq!(out, b"SGVsbG8s\r\nIFdvcmxk\r\nIQ==\r\n");
    }

    #[test]
    fn test_base64_exact_line_has_single_separator() {
        let mut encoder = Base64Encoder::new(Some(4)).unwrap();
        let out = encode_chunked(&mut encoder, b"abcdef", &[6]);
        assert_eq!(out, b"YWJj\r\nZGVm\r\n");
    }

    #[test]
    fn test_base64_custom_separator() {
        let mut encoder = Base64Encoder::new(Some(4)).unwrap().with_line_separator("\n");
        let out = encode_chunked(&mut encoder, b"abcd", &[1]);
        assert_eq!(out, b"YWJj\nZA==\n");
    }

    #[test]
    fn test_base64_empty_input() {
        let mut encoder = Base64Encoder::new(Some(76)).unwrap();
        let mut out = Vec::new();
        encoder.finish(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_base64_zero_line_length() {
        assert!(matches!(Base64Encoder::new(Some(0)), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_quoted_printable_encode() {
        let encoded = encode_quoted_printable(b"Hello, World!", 76).unwrap();
        assert_eq!(encoded, "Hello, World!");

        let encoded = encode_quoted_printable("Héllo, Wørld!".as_bytes(), 76).unwrap();
        assert_eq!(encoded, "H=C3=A9llo, W=C3=B8rld!");

        let encoded = encode_quoted_printable(b"a=b", 76).unwrap();
        assert_eq!(encoded, "a=3Db");
    }

    #[test]
    fn test_quoted_printable_line_breaks() {
        let encoded = encode_quoted_printable(b"one \r\ntwo\nthree\r", 76).unwrap();
        assert_eq!(encoded, "one=20\r\ntwo=0Athree=0D");
    }

    #[test]
    fn test_quoted_printable_trailing_whitespace() {
        let encoded = encode_quoted_printable(b"end\t", 76).unwrap();
        assert_eq!(encoded, "end=09");
    }

    #[test]
    fn test_quoted_printable_soft_breaks() {
        let data = "x".repeat(200);
        let encoded = encode_quoted_printable(data.as_bytes(), 76).unwrap();
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 76);
        }
        assert!(encoded.contains("=\r\n"));
        assert_eq!(decode_quoted_printable(&encoded).unwrap(), data.as_bytes());
    }

    #[test]
    fn test_quoted_printable_too_short() {
        assert!(QuotedPrintableEncoder::new(3).is_err());
    }

    #[test]
    fn test_quoted_printable_decode() {
        let decoded = decode_quoted_printable("H=C3=A9llo").unwrap();
        assert_eq!(decoded, "Héllo".as_bytes());

        assert!(decode_quoted_printable("bad=Z").is_err());
        assert!(decode_quoted_printable("bad=ZZ").is_err());
    }

    #[test]
    fn test_quoted_printable_soft_line_break() {
        let decoded = decode_quoted_printable("Hello=\r\nWorld=\nAgain").unwrap();
        assert_eq!(decoded, b"HelloWorldAgain");
    }

    #[test]
    fn test_identity() {
        let mut encoder = IdentityEncoder;
        let out = encode_chunked(&mut encoder, "naïve\r\n".as_bytes(), &[2]);
        assert_eq!(out, "naïve\r\n".as_bytes());
    }

    proptest! {
        #[test]
        fn prop_base64_any_partition(
            data in proptest::collection::vec(any::<u8>(), 0..2000),
            sizes in proptest::collection::vec(1usize..64, 1..8),
        ) {
            let mut encoder = Base64Encoder::new(Some(76)).unwrap();
            let out = encode_chunked(&mut encoder, &data, &sizes);
            prop_assert_eq!(decode_base64(&strip_crlf(&out)).unwrap(), data);
        }

        #[test]
        fn prop_base64_line_lengths(
            data in proptest::collection::vec(any::<u8>(), 1..1000),
            sizes in proptest::collection::vec(1usize..64, 1..8),
            max in 4usize..100,
        ) {
            let mut encoder = Base64Encoder::new(Some(max)).unwrap();
            let out = encode_chunked(&mut encoder, &data, &sizes);
            let text = String::from_utf8(out).unwrap();
            prop_assert!(text.ends_with("\r\n"));

            let lines: Vec<&str> = text.trim_end_matches("\r\n").split("\r\n").collect();
            let (last, full) = lines.split_last().unwrap();
            for line in full {
                prop_assert_eq!(line.len(), max);
            }
            prop_assert!(!last.is_empty() && last.len() <= max);
        }

        #[test]
        fn prop_quoted_printable_any_partition(
            data in proptest::collection::vec(any::<u8>(), 0..1000),
            sizes in proptest::collection::vec(1usize..32, 1..8),
            max in 4usize..100,
        ) {
            let mut encoder = QuotedPrintableEncoder::new(max).unwrap();
            let out = encode_chunked(&mut encoder, &data, &sizes);
            let text = String::from_utf8(out).unwrap();
            for line in text.split("\r\n") {
                prop_assert!(line.len() <= max);
                prop_assert!(!line.ends_with(' ') && !line.ends_with('\t'));
            }
            prop_assert_eq!(decode_quoted_printable(&text).unwrap(), data);
        }
    }
}
