//! MIME header handling.

use crate::error::{Error, Result};
use crate::fold::{FoldOptions, fold_decode, fold_encode};
use std::fmt;

/// Ordered collection of email headers.
///
/// Names are lowercased. Setting an existing name replaces its value in
/// place, so encoding order is first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    headers: Vec<(String, String)>,
}

impl HeaderMap {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a header value, replacing any existing value.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref().to_lowercase();
        let value = value.into();
        match self.headers.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Gets the value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let name = name.to_lowercase();
        let index = self.headers.iter().position(|(n, _)| *n == name)?;
        Some(self.headers.remove(index).1)
    }

    /// Number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Checks if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Folds every header into CRLF-terminated lines.
    ///
    /// # Errors
    ///
    /// Returns the first folding error (invalid or oversized key).
    pub fn encode(&self, options: &FoldOptions) -> Result<String> {
        let mut encoded = String::new();
        for (name, value) in &self.headers {
            encoded.push_str(&fold_encode(name, value, options)?);
        }
        Ok(encoded)
    }

    /// Parses a header block.
    ///
    /// Each line that starts with a space or tab continues the header above
    /// it. One empty trailing line is tolerated.
    ///
    /// # Errors
    ///
    /// Returns an error if a header cannot be unfolded, or if the block
    /// starts with a continuation line.
    pub fn decode(raw: &str) -> Result<Self> {
        let mut lines: Vec<&str> = raw
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        if lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }

        let mut groups: Vec<String> = Vec::new();
        for line in lines {
            if line.starts_with(' ') || line.starts_with('\t') {
                let group = groups
                    .last_mut()
                    .ok_or_else(|| Error::MissingSeparator(line.to_string()))?;
                group.push_str("\r\n");
                group.push_str(line);
            } else {
                groups.push(line.to_string());
            }
        }

        let mut headers = Self::new();
        for group in &groups {
            let (name, value) = fold_decode(group)?;
            headers.set(name, value);
        }
        Ok(headers)
    }
}

impl fmt::Display for HeaderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.headers {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
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

    #[test]
    fn test_headers_new() {
        let headers = HeaderMap::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_set_get() {
        let mut headers = HeaderMap::new();
        headers.set("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_last_write_wins_in_place() {
        let mut headers = HeaderMap::new();
        headers.set("To", "alice@example.com");
        headers.set("Subject", "Hi");
        headers.set("TO", "charlie@example.com");

        assert_eq!(headers.len(), 2);
        let names: Vec<&str> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["to", "subject"]);
        assert_eq!(headers.get("to"), Some("charlie@example.com"));
    }

    #[test]
    fn test_headers_remove() {
        let mut headers = HeaderMap::new();
        headers.set("Subject", "Test");
        assert_eq!(headers.remove("subject").as_deref(), Some("Test"));
        assert!(headers.get("Subject").is_none());
    }

    #[test]
    fn test_headers_encode() {
        let mut headers = HeaderMap::new();
        headers.set("Subject", "Test Message");
        headers.set("X-Mailer", "mailcompose");

        let encoded = headers.encode(&FoldOptions::default()).unwrap();
        assert_eq!(encoded, "subject: Test Message\r\nx-mailer: mailcompose\r\n");
    }

    #[test]
    fn test_headers_encode_invalid_key() {
        let mut headers = HeaderMap::new();
        headers.set("bad key", "v");
        assert!(matches!(
            headers.encode(&FoldOptions::default()),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_headers_decode() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            "        charset=utf-8\r\n",
            "\r\n"
        );

        let headers = HeaderMap::decode(text).unwrap();
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("To"), Some("recipient@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
    }

    #[test]
    fn test_headers_round_trip() {
        let mut headers = HeaderMap::new();
        headers.set(
            "subject",
            "a fairly long subject line that will certainly need to be folded across \
             more than one physical line when encoded",
        );
        headers.set("x-token", "t".repeat(120));
        headers.set("to", "<a@example.com>");

        let encoded = headers.encode(&FoldOptions::default()).unwrap();
        let decoded = HeaderMap::decode(&encoded).unwrap();
        assert_eq!(decoded, headers);
    }

    #[test]
    fn test_headers_decode_leading_continuation() {
        assert!(matches!(
            HeaderMap::decode("  orphan\r\nsubject: x\r\n"),
            Err(Error::MissingSeparator(_))
        ));
    }

    #[test]
    fn test_headers_display() {
        let mut headers = HeaderMap::new();
        headers.set("from", "sender@example.com");
        headers.set("to", "recipient@example.com");

        let s = headers.to_string();
        assert_eq!(s, "from: sender@example.com\r\nto: recipient@example.com\r\n");
    }
}
