//! `content-transfer-encoding` values.

use crate::encoding::{Base64Encoder, IdentityEncoder, QuotedPrintableEncoder, StreamEncoder};
use crate::error::Result;
use std::fmt;

/// Content transfer encoding of a part body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransferEncoding {
    /// 7-bit ASCII.
    SevenBit,
    /// 8-bit text.
    EightBit,
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// Binary (no encoding).
    Binary,
}

impl TransferEncoding {
    /// Parses a transfer encoding name, defaulting to `7bit`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            "binary" => Self::Binary,
            _ => Self::SevenBit,
        }
    }

    /// Picks the encoding for a body.
    ///
    /// Plain text goes out as `8bit` when the transport accepts UTF-8 and as
    /// `quoted-printable` otherwise. Everything else is `base64`.
    #[must_use]
    pub const fn select(plain_text: bool, utf8_support: bool) -> Self {
        match (plain_text, utf8_support) {
            (true, true) => Self::EightBit,
            (true, false) => Self::QuotedPrintable,
            (false, _) => Self::Base64,
        }
    }

    /// Creates a streaming encoder producing lines of at most
    /// `max_line_length` characters.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the line length is too small for the
    /// encoding.
    pub fn encoder(self, max_line_length: usize) -> Result<Box<dyn StreamEncoder + Send>> {
        Ok(match self {
            Self::Base64 => Box::new(Base64Encoder::new(Some(max_line_length))?),
            Self::QuotedPrintable => Box::new(QuotedPrintableEncoder::new(max_line_length)?),
            Self::SevenBit | Self::EightBit | Self::Binary => Box::new(IdentityEncoder),
        })
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SevenBit => write!(f, "7bit"),
            Self::EightBit => write!(f, "8bit"),
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Binary => write!(f, "binary"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(TransferEncoding::parse(" Base64 "), TransferEncoding::Base64);
        assert_eq!(TransferEncoding::parse("unknown"), TransferEncoding::SevenBit);
        assert_eq!(TransferEncoding::QuotedPrintable.to_string(), "quoted-printable");
        assert_eq!(TransferEncoding::EightBit.to_string(), "8bit");
    }

    #[test]
    fn test_select() {
        assert_eq!(TransferEncoding::select(true, true), TransferEncoding::EightBit);
        assert_eq!(TransferEncoding::select(true, false), TransferEncoding::QuotedPrintable);
        assert_eq!(TransferEncoding::select(false, true), TransferEncoding::Base64);
        assert_eq!(TransferEncoding::select(false, false), TransferEncoding::Base64);
    }

    #[test]
    fn test_encoder() {
        let mut out = Vec::new();
        let mut encoder = TransferEncoding::Base64.encoder(76).unwrap();
        encoder.feed(b"Hello", &mut out);
        encoder.finish(&mut out);
        assert_eq!(out, b"SGVsbG8=\r\n");

        let mut out = Vec::new();
        let mut encoder = TransferEncoding::EightBit.encoder(76).unwrap();
        encoder.feed(b"Hello", &mut out);
        encoder.finish(&mut out);
        assert_eq!(out, b"Hello");

        assert!(TransferEncoding::QuotedPrintable.encoder(2).is_err());
    }
}
