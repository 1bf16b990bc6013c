//! Mailbox lists for `from`, `to` and `message-id` headers.

use crate::error::{Error, Result};
use std::fmt;

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: String,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Creates a new mailbox with a display name and address.
    #[must_use]
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }

    /// Encodes as `<address>`, `name <address>` or `"name" <address>`.
    ///
    /// The name is quoted only when it contains characters outside
    /// `[A-Za-z0-9_.\- ]`.
    #[must_use]
    pub fn encode(&self) -> String {
        match self.name.as_deref() {
            None | Some("") => format!("<{}>", self.address),
            Some(name) if is_plain_phrase(name) => format!("{name} <{}>", self.address),
            Some(name) => {
                let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{escaped}\" <{}>", self.address)
            }
        }
    }
}

impl fmt::Display for Mailbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn is_plain_phrase(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ' '))
}

/// Ordered list of mailboxes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressList(Vec<Mailbox>);

impl AddressList {
    /// Creates an empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a mailbox.
    #[must_use]
    pub fn with(mut self, mailbox: Mailbox) -> Self {
        self.0.push(mailbox);
        self
    }

    /// Appends a mailbox.
    pub fn push(&mut self, mailbox: Mailbox) {
        self.0.push(mailbox);
    }

    /// Number of mailboxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks if the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the mailboxes.
    pub fn iter(&self) -> impl Iterator<Item = &Mailbox> {
        self.0.iter()
    }

    /// Encodes the mailboxes joined with `", "`.
    #[must_use]
    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(Mailbox::encode)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Encodes a list that must hold exactly one mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAddresses`] or [`Error::TooManyAddresses`].
    pub fn encode_single(&self, header: &'static str) -> Result<String> {
        match self.0.len() {
            0 => Err(Error::NoAddresses(header)),
            1 => Ok(self.encode()),
            count => Err(Error::TooManyAddresses { header, count }),
        }
    }

    /// Encodes a list that must hold at least one mailbox.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAddresses`] if the list is empty.
    pub fn encode_non_empty(&self, header: &'static str) -> Result<String> {
        if self.0.is_empty() {
            return Err(Error::NoAddresses(header));
        }
        Ok(self.encode())
    }
}

impl From<Mailbox> for AddressList {
    fn from(mailbox: Mailbox) -> Self {
        Self(vec![mailbox])
    }
}

impl FromIterator<Mailbox> for AddressList {
    fn from_iter<I: IntoIterator<Item = Mailbox>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_address_only() {
        assert_eq!(Mailbox::new("user@example.com").encode(), "<user@example.com>");
        assert_eq!(
            Mailbox::with_name("", "user@example.com").encode(),
            "<user@example.com>"
        );
    }

    #[test]
    fn test_plain_name_unquoted() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com");
        assert_eq!(mailbox.encode(), "John Doe <john@example.com>");
    }

    #[test]
    fn test_special_name_quoted_once() {
        let mailbox = Mailbox::with_name("Doe, John", "john@example.com");
        assert_eq!(mailbox.encode(), "\"Doe, John\" <john@example.com>");

        let mailbox = Mailbox::with_name("The \"Boss\"", "boss@example.com");
        assert_eq!(mailbox.encode(), "\"The \\\"Boss\\\"\" <boss@example.com>");
    }

    #[test]
    fn test_list_encoding() {
        let list = AddressList::new()
            .with(Mailbox::with_name("Alice", "alice@example.com"))
            .with(Mailbox::with_name("Bob (work)", "bob@example.com"))
            .with(Mailbox::new("carol@example.com"));
        assert_eq!(
            list.encode(),
            "Alice <alice@example.com>, \"Bob (work)\" <bob@example.com>, <carol@example.com>"
        );
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_encode_single() {
        let one = AddressList::from(Mailbox::new("a@example.com"));
        assert_eq!(one.encode_single("from").unwrap(), "<a@example.com>");

        let two: AddressList = [Mailbox::new("a@example.com"), Mailbox::new("b@example.com")]
            .into_iter()
            .collect();
        assert!(matches!(
            two.encode_single("from"),
            Err(Error::TooManyAddresses { header: "from", count: 2 })
        ));

        assert!(matches!(
            AddressList::new().encode_single("from"),
            Err(Error::NoAddresses("from"))
        ));
    }

    #[test]
    fn test_encode_non_empty() {
        assert!(AddressList::new().encode_non_empty("to").is_err());
        let list = AddressList::from(Mailbox::new("a@example.com"));
        assert_eq!(list.encode_non_empty("to").unwrap(), "<a@example.com>");
    }
}
