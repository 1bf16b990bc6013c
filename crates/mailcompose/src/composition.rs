//! The message being composed.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, TimeZone};
use mailcompose_mime::{AddressList, ContentType, HeaderMap, MediaType};
use rand::Rng;

use crate::error::Result;
use crate::identifier::{BOUNDARY_LENGTH, MESSAGE_ID_LENGTH, generate_boundary, generate_message_id};
use crate::part::{Attachment, Section};
use crate::template::{Locals, Template};

/// A multipart/mixed message: root headers, attachments and text sections.
///
/// The boundary and message id are generated once at construction.
/// Attachments are encoded before sections, each in insertion order.
#[derive(Debug, Clone)]
pub struct Composition {
    headers: HeaderMap,
    boundary: String,
    message_id: String,
    attachments: Vec<Attachment>,
    sections: Vec<Section>,
}

impl Composition {
    /// Creates a composition whose message id uses `domain`.
    #[must_use]
    pub fn new(domain: &str) -> Self {
        Self::with_rng(domain, &mut rand::thread_rng())
    }

    /// Creates a composition drawing its identifiers from `rng`.
    #[must_use]
    pub fn with_rng<R: Rng + ?Sized>(domain: &str, rng: &mut R) -> Self {
        let boundary = generate_boundary(rng, BOUNDARY_LENGTH);
        let message_id = format!("<{}>", generate_message_id(rng, domain, MESSAGE_ID_LENGTH));

        let mut headers = HeaderMap::new();
        headers.set("content-type", ContentType::multipart_mixed(&boundary).encode());
        headers.set("message-id", &message_id);

        Self {
            headers,
            boundary,
            message_id,
            attachments: Vec::new(),
            sections: Vec::new(),
        }
    }

    /// Root headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Multipart boundary.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Message id, including angle brackets.
    #[must_use]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Attachments in encoding order.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Sections in encoding order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Sets any root header.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    /// Sets the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.headers.set("subject", subject);
    }

    /// Sets the sender from a list holding exactly one mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty or holds more than one mailbox.
    pub fn set_from(&mut self, from: &AddressList) -> Result<()> {
        let value = from.encode_single("from")?;
        self.headers.set("from", value);
        Ok(())
    }

    /// Sets the sender verbatim.
    pub fn set_from_raw(&mut self, from: impl Into<String>) {
        self.headers.set("from", from);
    }

    /// Sets the recipients.
    ///
    /// # Errors
    ///
    /// Returns an error if the list is empty.
    pub fn set_to(&mut self, to: &AddressList) -> Result<()> {
        let value = to.encode_non_empty("to")?;
        self.headers.set("to", value);
        Ok(())
    }

    /// Sets the recipients verbatim.
    pub fn set_to_raw(&mut self, to: impl Into<String>) {
        self.headers.set("to", to);
    }

    /// Sets the date in RFC 2822 format.
    pub fn set_date<Tz>(&mut self, date: &DateTime<Tz>)
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        self.headers.set("date", date.to_rfc2822());
    }

    /// Sets the date verbatim.
    pub fn set_date_raw(&mut self, date: impl Into<String>) {
        self.headers.set("date", date);
    }

    /// Sets the `x-mailer` header.
    pub fn set_mailer(&mut self, mailer: impl Into<String>) {
        self.headers.set("x-mailer", mailer);
    }

    /// Adds a text section.
    pub fn add_text_section(&mut self, media_type: MediaType, data: impl Into<Bytes>) {
        self.sections.push(Section::Buffer {
            media_type,
            data: data.into(),
        });
    }

    /// Adds a section rendered from `template` when the message is encoded.
    pub fn add_template_section(
        &mut self,
        media_type: MediaType,
        template: impl Template + 'static,
        locals: Locals,
    ) {
        self.sections.push(Section::Template {
            media_type,
            template: Arc::new(template),
            locals,
        });
    }

    /// Adds an in-memory attachment.
    pub fn add_buffer_attachment(
        &mut self,
        file_name: impl Into<String>,
        media_type: MediaType,
        data: impl Into<Bytes>,
    ) {
        self.attachments
            .push(Attachment::buffer(file_name, media_type, data));
    }

    /// Adds a file attachment, read when the message is encoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedExtension`](crate::Error::UnsupportedExtension)
    /// if no media type is given and the extension is not recognized.
    pub fn add_file_attachment(
        &mut self,
        path: impl AsRef<Path>,
        media_type: Option<MediaType>,
    ) -> Result<()> {
        self.attachments.push(Attachment::file(path, media_type)?);
        Ok(())
    }

    /// Adds a prepared attachment.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
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
    use crate::error::Error;
    use chrono::Utc;
    use mailcompose_mime::Mailbox;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn composition() -> Composition {
        Composition::with_rng("example.com", &mut StdRng::seed_from_u64(1))
    }

    #[test]
    fn test_new_sets_identifiers() {
        let composition = composition();

        assert!(composition.boundary().starts_with("Part_"));
        assert_eq!(composition.boundary().len(), 35);
        assert!(composition.message_id().starts_with('<'));
        assert!(composition.message_id().ends_with("@example.com>"));

        let content_type = ContentType::decode(composition.headers().get("content-type").unwrap()).unwrap();
        assert_eq!(content_type.media_type(), Some("multipart/mixed"));
        assert_eq!(content_type.boundary(), Some(composition.boundary()));
        assert_eq!(composition.headers().get("message-id"), Some(composition.message_id()));
    }

    #[test]
    fn test_seeded_compositions_match() {
        assert_eq!(composition().boundary(), composition().boundary());
        let other = Composition::new("example.com");
        assert_ne!(other.boundary(), composition().boundary());
    }

    #[test]
    fn test_header_order() {
        let mut composition = composition();
        composition.set_subject("Hello");
        composition.set_from_raw("a@example.com");
        composition.set_mailer("mailcompose");
        composition.set_subject("Hello again");

        let names: Vec<&str> = composition.headers().iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["content-type", "message-id", "subject", "from", "x-mailer"]);
        assert_eq!(composition.headers().get("subject"), Some("Hello again"));
    }

    #[test]
    fn test_set_from_single() {
        let mut composition = composition();
        composition
            .set_from(&AddressList::from(Mailbox::with_name("Ada", "ada@example.com")))
            .unwrap();
        assert_eq!(composition.headers().get("from"), Some("Ada <ada@example.com>"));
    }

    #[test]
    fn test_set_from_too_many() {
        let mut composition = composition();
        let from: AddressList = [Mailbox::new("a@example.com"), Mailbox::new("b@example.com")]
            .into_iter()
            .collect();

        assert!(matches!(
            composition.set_from(&from),
            Err(Error::Mime(mailcompose_mime::Error::TooManyAddresses { count: 2, .. }))
        ));
        assert!(composition.headers().get("from").is_none());
    }

    #[test]
    fn test_set_to() {
        let mut composition = composition();
        assert!(composition.set_to(&AddressList::new()).is_err());

        let to = AddressList::new()
            .with(Mailbox::new("a@example.com"))
            .with(Mailbox::with_name("B, Jr.", "b@example.com"));
        composition.set_to(&to).unwrap();
        assert_eq!(
            composition.headers().get("to"),
            Some("<a@example.com>, \"B, Jr.\" <b@example.com>")
        );
    }

    #[test]
    fn test_set_date() {
        let mut composition = composition();
        let date = Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap();
        composition.set_date(&date);
        assert_eq!(
            composition.headers().get("date"),
            Some("Fri, 16 Oct 2026 10:00:00 +0000")
        );
    }

    #[test]
    fn test_parts_keep_order() {
        let mut composition = composition();
        composition.add_text_section(MediaType::TextPlain, "one");
        composition.add_template_section(
            MediaType::TextHtml,
            |_: &Locals| -> std::result::Result<Vec<u8>, crate::TemplateError> { Ok(b"two".to_vec()) },
            Locals::new(),
        );
        composition.add_buffer_attachment("a.bin", MediaType::ApplicationOctetStream, vec![0u8; 4]);
        composition.add_file_attachment("/tmp/b.csv", None).unwrap();

        assert_eq!(composition.sections().len(), 2);
        assert_eq!(composition.sections()[1].media_type(), MediaType::TextHtml);
        assert_eq!(composition.attachments()[0].file_name(), "a.bin");
        assert_eq!(composition.attachments()[1].media_type(), MediaType::TextCsv);
    }

    #[test]
    fn test_add_file_attachment_unsupported() {
        let mut composition = composition();
        assert!(matches!(
            composition.add_file_attachment("/tmp/archive.rar", None),
            Err(Error::UnsupportedExtension { .. })
        ));
        assert!(composition.attachments().is_empty());
    }
}
