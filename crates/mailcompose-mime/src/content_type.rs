//! Structured header values: a primary token plus `key=value` parameters.
//!
//! Used for `content-type` (`text/plain; charset=utf-8`) and
//! `content-disposition` (`attachment; filename=report.pdf; size=1024`).

use crate::error::{Error, Result};
use crate::media_type::MediaType;
use chrono::{DateTime, Utc};
use std::fmt;

/// Date format used by disposition date parameters.
const DISPOSITION_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Primary token with ordered parameters.
///
/// Parameter keys are trimmed and lowercased. Setting an existing key
/// replaces its value without changing its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappedHeaderValue {
    primary: Option<String>,
    parameters: Vec<(String, String)>,
}

impl MappedHeaderValue {
    /// Creates an empty value without a primary token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty value with the given primary token.
    #[must_use]
    pub fn with_primary(primary: impl Into<String>) -> Self {
        Self {
            primary: Some(primary.into()),
            parameters: Vec::new(),
        }
    }

    /// Returns the primary token if present.
    #[must_use]
    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// Sets a parameter, replacing any previous value for the key.
    pub fn set(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        let key = normalize_key(key.as_ref());
        let value = value.into();
        match self.parameters.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.parameters.push((key, value)),
        }
    }

    /// Gets a parameter value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        let key = normalize_key(key);
        self.parameters
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Gets a parameter value that must be present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] if the key is absent.
    pub fn get_required(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| Error::MissingParameter(normalize_key(key)))
    }

    /// Removes a parameter, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let key = normalize_key(key);
        let index = self.parameters.iter().position(|(k, _)| *k == key)?;
        Some(self.parameters.remove(index).1)
    }

    /// Returns an iterator over the parameters in insertion order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameters.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encodes as `primary; key=value; key="quoted value"`.
    #[must_use]
    pub fn encode(&self) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.parameters.len() + 1);
        if let Some(primary) = &self.primary {
            parts.push(primary.clone());
        }
        for (key, value) in &self.parameters {
            if needs_quotes(value) {
                parts.push(format!("{key}={}", quote(value)));
            } else {
                parts.push(format!("{key}={value}"));
            }
        }
        parts.join("; ")
    }

    /// Decodes a raw header value.
    ///
    /// When `with_primary` is set the first `;`-separated segment is the
    /// primary token; every other non-empty segment must be a `key=value`
    /// pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPair`] if a parameter segment has no `=`.
    pub fn decode(raw: &str, with_primary: bool) -> Result<Self> {
        let mut segments = raw.split(';');
        let mut result = Self::new();

        if with_primary {
            let token = segments.next().unwrap_or_default().trim();
            if !token.is_empty() {
                result.primary = Some(token.to_string());
            }
        }

        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| Error::MalformedPair(segment.to_string()))?;
            result.set(key, unquote(value.trim()));
        }

        Ok(result)
    }
}

impl fmt::Display for MappedHeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty()
        || value.contains(|c: char| c.is_whitespace() || c == '"' || c == '\\')
}

fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut result = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                result.push(escaped);
            }
        } else {
            result.push(c);
        }
    }
    result
}

/// `content-type` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    value: MappedHeaderValue,
}

impl ContentType {
    /// Creates a content type without parameters.
    #[must_use]
    pub fn new(media_type: MediaType) -> Self {
        Self {
            value: MappedHeaderValue::with_primary(media_type.as_str()),
        }
    }

    /// Creates a `text/*` content type with `charset=utf-8`.
    #[must_use]
    pub fn utf8(media_type: MediaType) -> Self {
        Self::new(media_type).with_parameter("charset", "utf-8")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new(MediaType::MultipartMixed).with_parameter("boundary", boundary)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.value.set(key, value);
        self
    }

    /// Returns the `type/subtype` token.
    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        self.value.primary()
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.value.get("charset")
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.value.get("boundary")
    }

    /// Returns the underlying parameter map.
    #[must_use]
    pub const fn value(&self) -> &MappedHeaderValue {
        &self.value
    }

    /// Encodes the header value.
    #[must_use]
    pub fn encode(&self) -> String {
        self.value.encode()
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter is malformed.
    pub fn decode(raw: &str) -> Result<Self> {
        Ok(Self {
            value: MappedHeaderValue::decode(raw, true)?,
        })
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Presentation of a body part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispositionKind {
    /// Displayed as part of the message.
    Inline,
    /// Offered as a separate file.
    Attachment,
}

impl DispositionKind {
    /// Returns the header token.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

/// `content-disposition` header value (RFC 2183).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    value: MappedHeaderValue,
}

impl ContentDisposition {
    /// Creates a disposition of the given kind.
    #[must_use]
    pub fn new(kind: DispositionKind) -> Self {
        Self {
            value: MappedHeaderValue::with_primary(kind.as_str()),
        }
    }

    /// Returns the disposition token.
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.value.primary()
    }

    /// Sets the file name.
    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.value.set("filename", filename);
    }

    /// Returns the file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] if no file name is set.
    pub fn filename(&self) -> Result<&str> {
        self.value.get_required("filename")
    }

    /// Sets the size in bytes.
    pub fn set_size(&mut self, size: u64) {
        self.value.set("size", size.to_string());
    }

    /// Returns the size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size is missing or not a number.
    pub fn size(&self) -> Result<u64> {
        let raw = self.value.get_required("size")?;
        raw.parse()
            .map_err(|_| Error::MalformedPair(format!("size={raw}")))
    }

    /// Sets the creation date.
    pub fn set_creation_date(&mut self, date: DateTime<Utc>) {
        self.set_date("creation-date", date);
    }

    /// Returns the creation date.
    ///
    /// # Errors
    ///
    /// Returns an error if the date is missing or unparsable.
    pub fn creation_date(&self) -> Result<DateTime<Utc>> {
        self.date("creation-date")
    }

    /// Sets the modification date.
    pub fn set_modification_date(&mut self, date: DateTime<Utc>) {
        self.set_date("modification-date", date);
    }

    /// Returns the modification date.
    ///
    /// # Errors
    ///
    /// Returns an error if the date is missing or unparsable.
    pub fn modification_date(&self) -> Result<DateTime<Utc>> {
        self.date("modification-date")
    }

    /// Sets the read date.
    pub fn set_read_date(&mut self, date: DateTime<Utc>) {
        self.set_date("read-date", date);
    }

    /// Returns the read date.
    ///
    /// # Errors
    ///
    /// Returns an error if the date is missing or unparsable.
    pub fn read_date(&self) -> Result<DateTime<Utc>> {
        self.date("read-date")
    }

    fn set_date(&mut self, key: &str, date: DateTime<Utc>) {
        self.value
            .set(key, date.format(DISPOSITION_DATE_FORMAT).to_string());
    }

    fn date(&self, key: &str) -> Result<DateTime<Utc>> {
        let raw = self.value.get_required(key)?;
        DateTime::parse_from_rfc2822(raw)
            .map(|date| date.with_timezone(&Utc))
            .map_err(|_| Error::InvalidDate(raw.to_string()))
    }

    /// Returns the underlying parameter map.
    #[must_use]
    pub const fn value(&self) -> &MappedHeaderValue {
        &self.value
    }

    /// Encodes the header value.
    #[must_use]
    pub fn encode(&self) -> String {
        self.value.encode()
    }

    /// Parses a content disposition string.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter is malformed.
    pub fn decode(raw: &str) -> Result<Self> {
        Ok(Self {
            value: MappedHeaderValue::decode(raw, true)?,
        })
    }
}

impl fmt::Display for ContentDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    #[test]
    fn test_set_normalizes_keys() {
        let mut value = MappedHeaderValue::new();
        value.set("  CharSet ", "utf-8");
        assert_eq!(value.get("charset"), Some("utf-8"));
        assert_eq!(value.get("CHARSET"), Some("utf-8"));

        value.set("charset", "us-ascii");
        assert_eq!(value.parameters().count(), 1);
        assert_eq!(value.get("charset"), Some("us-ascii"));
    }

    #[test]
    fn test_get_required() {
        let value = MappedHeaderValue::new();
        assert!(value.get("filename").is_none());
        assert!(matches!(
            value.get_required("Filename"),
            Err(Error::MissingParameter(key)) if key == "filename"
        ));
    }

    #[test]
    fn test_encode_quotes_whitespace() {
        let mut value = MappedHeaderValue::with_primary("attachment");
        value.set("filename", "annual report.pdf");
        value.set("size", "42");
        assert_eq!(
            value.encode(),
            "attachment; filename=\"annual report.pdf\"; size=42"
        );
    }

    #[test]
    fn test_encode_escapes_quotes() {
        let mut value = MappedHeaderValue::new();
        value.set("title", "say \"hi\"");
        assert_eq!(value.encode(), "title=\"say \\\"hi\\\"\"");

        let decoded = MappedHeaderValue::decode(&value.encode(), false).unwrap();
        assert_eq!(decoded.get("title"), Some("say \"hi\""));
    }

    #[test]
    fn test_decode() {
        let value =
            MappedHeaderValue::decode("multipart/mixed; Boundary=\"----=_Part_123\"", true)
                .unwrap();
        assert_eq!(value.primary(), Some("multipart/mixed"));
        assert_eq!(value.get("boundary"), Some("----=_Part_123"));
    }

    #[test]
    fn test_decode_malformed_pair() {
        assert!(matches!(
            MappedHeaderValue::decode("text/plain; charset", true),
            Err(Error::MalformedPair(segment)) if segment == "charset"
        ));
    }

    #[test]
    fn test_content_type() {
        let ct = ContentType::multipart_mixed("abc123");
        assert_eq!(ct.encode(), "multipart/mixed; boundary=abc123");
        assert_eq!(ct.boundary(), Some("abc123"));

        let ct = ContentType::utf8(MediaType::TextHtml);
        assert_eq!(ct.to_string(), "text/html; charset=utf-8");

        let parsed = ContentType::decode("text/plain; charset=UTF-8").unwrap();
        assert_eq!(parsed.media_type(), Some("text/plain"));
        assert_eq!(parsed.charset(), Some("UTF-8"));
    }

    #[test]
    fn test_content_disposition() {
        let date = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        let mut disposition = ContentDisposition::new(DispositionKind::Attachment);
        disposition.set_filename("notes.txt");
        disposition.set_size(1024);
        disposition.set_creation_date(date);
        disposition.set_modification_date(date);
        disposition.set_read_date(date);

        let encoded = disposition.encode();
        assert!(encoded.starts_with("attachment; filename=notes.txt; size=1024; "));
        assert!(encoded.contains("creation-date=\"Fri, 01 Mar 2024 12:30:05 GMT\""));

        let decoded = ContentDisposition::decode(&encoded).unwrap();
        assert_eq!(decoded.kind(), Some("attachment"));
        assert_eq!(decoded.filename().unwrap(), "notes.txt");
        assert_eq!(decoded.size().unwrap(), 1024);
        assert_eq!(decoded.creation_date().unwrap(), date);
        assert_eq!(decoded.modification_date().unwrap(), date);
        assert_eq!(decoded.read_date().unwrap(), date);
    }

    #[test]
    fn test_disposition_bad_size() {
        let disposition = ContentDisposition::decode("attachment; size=big").unwrap();
        assert!(matches!(disposition.size(), Err(Error::MalformedPair(_))));
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            primary in "[a-z]{1,10}/[a-z0-9.+-]{1,12}",
            params in proptest::collection::vec(("[a-z][a-z0-9-]{0,10}", "[^;\r\n]{0,30}"), 0..6),
        ) {
            let mut value = MappedHeaderValue::with_primary(primary.clone());
            for (key, val) in &params {
                value.set(key, val.trim());
            }

            let decoded = MappedHeaderValue::decode(&value.encode(), true).unwrap();
            prop_assert_eq!(decoded.primary(), Some(primary.as_str()));
            prop_assert_eq!(
                decoded.parameters().collect::<Vec<_>>(),
                value.parameters().collect::<Vec<_>>()
            );
        }
    }
}
