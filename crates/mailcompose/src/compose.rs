//! Streaming multipart encoder.
//!
//! [`Composer`] walks a [`Composition`] and yields the encoded message in
//! chunks: root headers, every attachment, every section, then the closing
//! delimiter. Nothing is read or rendered before the chunk that needs it is
//! requested, and at most one attachment file is open at a time.
//!
//! ```text
//! root headers
//! CRLF--boundaryCRLF
//! part headers CRLF body        (attachments, then sections)
//! ...
//! CRLF--boundary--CRLF
//! ```

use std::fs::Metadata;
use std::io;
use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::Stream;
use mailcompose_mime::encoding::StreamEncoder;
use mailcompose_mime::{
    ContentDisposition, ContentType, DispositionKind, FoldOptions, HeaderMap, MediaType,
    TransferEncoding,
};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::{debug, trace, warn};

use crate::composition::Composition;
use crate::config::ComposeOptions;
use crate::error::{Error, Result};
use crate::part::{Attachment, Section};

/// Where the composer resumes after a part body ends.
#[derive(Debug, Clone, Copy)]
enum Resume {
    Attachment(usize),
    Section(usize),
}

enum State {
    Headers,
    Attachment(usize),
    Section(usize),
    Body(Body),
    Close,
    Done,
}

impl From<Resume> for State {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::Attachment(index) => Self::Attachment(index),
            Resume::Section(index) => Self::Section(index),
        }
    }
}

/// Raw part content.
enum Source {
    Buffer(Bytes),
    File(File),
}

impl Source {
    async fn read(&mut self, size: usize) -> io::Result<Option<Bytes>> {
        match self {
            Self::Buffer(data) => {
                if data.is_empty() {
                    return Ok(None);
                }
                Ok(Some(data.split_to(size.min(data.len()))))
            }
            Self::File(file) => {
                let mut buf = vec![0; size];
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    return Ok(None);
                }
                buf.truncate(n);
                Ok(Some(Bytes::from(buf)))
            }
        }
    }
}

/// A part body being pushed through its transfer encoder.
struct Body {
    source: Source,
    encoder: Box<dyn StreamEncoder + Send>,
    resume: Resume,
    /// Set once the encoder has been flushed.
    finished: bool,
}

impl Body {
    fn new(source: Source, encoder: Box<dyn StreamEncoder + Send>, resume: Resume) -> Self {
        Self {
            source,
            encoder,
            resume,
            finished: false,
        }
    }

    /// Returns the next non-empty encoded chunk, or `None` once the encoder
    /// has been flushed.
    async fn next(&mut self, read_size: usize) -> Result<Option<Bytes>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            let mut out = Vec::new();
            let Some(input) = self.source.read(read_size).await? else {
                self.encoder.finish(&mut out);
                self.finished = true;
                return Ok((!out.is_empty()).then(|| Bytes::from(out)));
            };

            self.encoder.feed(&input, &mut out);
            if !out.is_empty() {
                return Ok(Some(Bytes::from(out)));
            }
        }
    }
}

/// Pull-driven encoder for a [`Composition`].
///
/// Any error is final: the composer yields nothing afterwards. Dropping it
/// closes the attachment file being read, if any.
pub struct Composer<'a> {
    composition: &'a Composition,
    options: ComposeOptions,
    fold: FoldOptions,
    state: State,
    bytes_emitted: usize,
}

impl<'a> Composer<'a> {
    /// Creates a composer positioned before the root headers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are invalid.
    pub fn new(composition: &'a Composition, options: ComposeOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            composition,
            options,
            fold: options.header_fold(),
            state: State::Headers,
            bytes_emitted: 0,
        })
    }

    /// Number of bytes yielded so far.
    #[must_use]
    pub const fn bytes_emitted(&self) -> usize {
        self.bytes_emitted
    }

    /// Produces the next chunk of the message, or `None` when it is complete.
    ///
    /// # Errors
    ///
    /// Returns the first header, I/O, template or part type error. The
    /// composer is finished afterwards.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let chunk = self.advance().await?;
        if let Some(chunk) = &chunk {
            self.bytes_emitted += chunk.len();
            trace!(len = chunk.len(), total = self.bytes_emitted, "Emitted chunk");
        }
        Ok(chunk)
    }

    /// Converts the composer into a stream of chunks.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes>> + Send + 'a {
        futures::stream::try_unfold(self, |mut composer| async move {
            Ok::<_, Error>(composer.next_chunk().await?.map(|chunk| (chunk, composer)))
        })
    }

    async fn advance(&mut self) -> Result<Option<Bytes>> {
        loop {
            // The state stays `Done` if anything below fails.
            match std::mem::replace(&mut self.state, State::Done) {
                State::Headers => {
                    let headers = self.composition.headers().encode(&self.fold)?;
                    self.state = State::Attachment(0);
                    return Ok(Some(Bytes::from(headers)));
                }
                State::Attachment(index) => {
                    let Some(attachment) = self.composition.attachments().get(index) else {
                        self.state = State::Section(0);
                        continue;
                    };
                    let (head, body) = self.open_attachment(index, attachment).await?;
                    self.state = State::Body(body);
                    return Ok(Some(head));
                }
                State::Section(index) => {
                    let Some(section) = self.composition.sections().get(index) else {
                        self.state = State::Close;
                        continue;
                    };
                    let (head, body) = self.open_section(index, section)?;
                    self.state = State::Body(body);
                    return Ok(Some(head));
                }
                State::Body(mut body) => {
                    if let Some(chunk) = body.next(self.options.read_chunk_size).await? {
                        self.state = State::Body(body);
                        return Ok(Some(chunk));
                    }
                    self.state = body.resume.into();
                }
                State::Close => {
                    let close = format!("\r\n--{}--\r\n", self.composition.boundary());
                    debug!(
                        total = self.bytes_emitted + close.len(),
                        "Finished composing message"
                    );
                    return Ok(Some(Bytes::from(close)));
                }
                State::Done => return Ok(None),
            }
        }
    }

    async fn open_attachment(
        &mut self,
        index: usize,
        attachment: &Attachment,
    ) -> Result<(Bytes, Body)> {
        let media_type = attachment.media_type();
        reject_multipart(media_type)?;
        let encoding = TransferEncoding::select(media_type.is_plain_text(), self.options.utf8_support);
        debug!(
            index,
            file_name = attachment.file_name(),
            %media_type,
            %encoding,
            "Encoding attachment"
        );

        let mut disposition = ContentDisposition::new(DispositionKind::Attachment);
        disposition.set_filename(attachment.file_name());

        let source = match attachment {
            Attachment::Buffer { data, .. } => {
                let now = Utc::now();
                disposition.set_size(data.len() as u64);
                disposition.set_creation_date(now);
                disposition.set_modification_date(now);
                disposition.set_read_date(now);
                Source::Buffer(data.clone())
            }
            Attachment::File { path, .. } => {
                let times = FileTimes::read(path).await?;
                disposition.set_size(times.size);
                disposition.set_creation_date(times.created);
                disposition.set_modification_date(times.modified);
                disposition.set_read_date(Utc::now());
                Source::File(File::open(path).await?)
            }
        };

        let mut headers = HeaderMap::new();
        headers.set("content-type", media_type.as_str());
        headers.set("content-transfer-encoding", encoding.to_string());
        headers.set("content-disposition", disposition.encode());

        let head = self.part_head(&headers)?;
        let body = Body::new(
            source,
            encoding.encoder(self.options.max_line_length)?,
            Resume::Attachment(index + 1),
        );
        Ok((head, body))
    }

    fn open_section(&self, index: usize, section: &Section) -> Result<(Bytes, Body)> {
        let media_type = section.media_type();
        reject_multipart(media_type)?;

        // Section bodies are always UTF-8 text, whatever their media type.
        let encoding = TransferEncoding::select(true, self.options.utf8_support);
        debug!(index, %media_type, %encoding, "Encoding section");

        let mut headers = HeaderMap::new();
        headers.set("content-type", ContentType::utf8(media_type).encode());
        headers.set("content-transfer-encoding", encoding.to_string());

        let head = self.part_head(&headers)?;
        let body = Body::new(
            Source::Buffer(section.body()?),
            encoding.encoder(self.options.max_line_length)?,
            Resume::Section(index + 1),
        );
        Ok((head, body))
    }

    /// Opening delimiter, folded part headers and the blank line before the
    /// body.
    fn part_head(&self, headers: &HeaderMap) -> Result<Bytes> {
        let mut head = format!("\r\n--{}\r\n", self.composition.boundary());
        head.push_str(&headers.encode(&self.fold)?);
        head.push_str("\r\n");
        Ok(Bytes::from(head))
    }
}

/// Nested multipart trees are not composed; such a part would also lack its
/// own boundary.
fn reject_multipart(media_type: MediaType) -> Result<()> {
    if media_type.is_multipart() {
        return Err(Error::UnsupportedPartType(media_type.to_string()));
    }
    Ok(())
}

/// Size and timestamps of an attachment file.
struct FileTimes {
    size: u64,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

impl FileTimes {
    async fn read(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let modified = DateTime::<Utc>::from(metadata.modified()?);

        Ok(Self {
            size: metadata.len(),
            created: creation_time(&metadata, path, modified),
            modified,
        })
    }
}

/// Inode change time (`st_ctime`).
#[cfg(unix)]
fn creation_time(metadata: &Metadata, path: &Path, modified: DateTime<Utc>) -> DateTime<Utc> {
    use std::os::unix::fs::MetadataExt;

    let nanos = u32::try_from(metadata.ctime_nsec()).unwrap_or(0);
    DateTime::from_timestamp(metadata.ctime(), nanos).unwrap_or_else(|| {
        warn!(path = %path.display(), "Change time out of range, using modification time");
        modified
    })
}

/// Birth time where the platform has no inode change time.
#[cfg(not(unix))]
fn creation_time(metadata: &Metadata, path: &Path, modified: DateTime<Utc>) -> DateTime<Utc> {
    metadata.created().map_or_else(
        |e| {
            warn!(path = %path.display(), error = %e, "Creation time unavailable, using modification time");
            modified
        },
        DateTime::<Utc>::from,
    )
}

/// Streams the encoded `composition`.
///
/// # Errors
///
/// Returns [`Error::Config`] if the options are invalid. Encoding errors are
/// yielded by the stream, which ends after the first one.
pub fn compose(
    composition: &Composition,
    options: ComposeOptions,
) -> Result<impl Stream<Item = Result<Bytes>> + Send + '_> {
    Ok(Composer::new(composition, options)?.into_stream())
}

/// Encodes the whole `composition` into memory.
///
/// # Errors
///
/// Returns the first configuration or encoding error.
pub async fn compose_to_vec(composition: &Composition, options: ComposeOptions) -> Result<Vec<u8>> {
    let mut composer = Composer::new(composition, options)?;
    let mut message = Vec::new();
    while let Some(chunk) = composer.next_chunk().await? {
        message.extend_from_slice(&chunk);
    }
    Ok(message)
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
    use crate::template::{Locals, TemplateError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn composition() -> Composition {
        let mut composition = Composition::with_rng("example.com", &mut StdRng::seed_from_u64(3));
        composition.set_subject("Test");
        composition
    }

    fn utf8() -> ComposeOptions {
        ComposeOptions::builder().utf8_support(true).build().unwrap()
    }

    #[test]
    fn test_empty_composition() {
        let composition = composition();
        let message = tokio_test::block_on(compose_to_vec(&composition, ComposeOptions::default())).unwrap();

        let expected = format!(
            "content-type: multipart/mixed; boundary={b}\r\nmessage-id: {id}\r\nsubject: Test\r\n\r\n--{b}--\r\n",
            b = composition.boundary(),
            id = composition.message_id(),
        );
        assert_eq!(String::from_utf8(message).unwrap(), expected);
    }

    #[test]
    fn test_section_eight_bit() {
        let mut composition = composition();
        composition.add_text_section(MediaType::TextPlain, "Hello");

        let message = tokio_test::block_on(compose_to_vec(&composition, utf8())).unwrap();
        let message = String::from_utf8(message).unwrap();

        let part = format!(
            "\r\n--{b}\r\ncontent-type: text/plain; charset=utf-8\r\ncontent-transfer-encoding: 8bit\r\n\r\nHello\r\n--{b}--\r\n",
            b = composition.boundary()
        );
        assert!(message.ends_with(&part), "{message}");
    }

    #[test]
    fn test_section_quoted_printable() {
        let mut composition = composition();
        composition.add_text_section(MediaType::TextPlain, "caf\u{e9}");

        let message =
            tokio_test::block_on(compose_to_vec(&composition, ComposeOptions::default())).unwrap();
        let message = String::from_utf8(message).unwrap();
        assert!(message.contains("content-transfer-encoding: quoted-printable\r\n\r\ncaf=C3=A9\r\n"));
    }

    #[test]
    fn test_template_rendered_during_encoding() {
        let mut composition = composition();
        let mut locals = Locals::new();
        locals.insert("who".into(), "world".into());
        composition.add_template_section(
            MediaType::TextHtml,
            |locals: &Locals| -> std::result::Result<Vec<u8>, TemplateError> {
                Ok(format!("<p>{}</p>", locals["who"].as_str().unwrap_or_default()).into_bytes())
            },
            locals,
        );

        let message = tokio_test::block_on(compose_to_vec(&composition, utf8())).unwrap();
        let message = String::from_utf8(message).unwrap();
        assert!(message.contains("content-type: text/html; charset=utf-8\r\n"));
        assert!(message.contains("\r\n\r\n<p>world</p>\r\n--"));
    }

    #[test]
    fn test_template_error_is_final() {
        let mut composition = composition();
        composition.add_template_section(
            MediaType::TextPlain,
            |_: &Locals| -> std::result::Result<Vec<u8>, TemplateError> { Err(TemplateError::new("bad")) },
            Locals::new(),
        );

        let mut composer = Composer::new(&composition, ComposeOptions::default()).unwrap();
        tokio_test::block_on(async {
            assert!(composer.next_chunk().await.unwrap().is_some());
            assert!(matches!(composer.next_chunk().await, Err(Error::Template(_))));
            assert!(composer.next_chunk().await.unwrap().is_none());
        });
    }

    #[test]
    fn test_non_text_section_encoded() {
        let mut composition = composition();
        composition.add_text_section(MediaType::ApplicationJson, "{\"a\": 1}");

        let message = tokio_test::block_on(compose_to_vec(&composition, utf8())).unwrap();
        let message = String::from_utf8(message).unwrap();
        assert!(message.contains(
            "content-type: application/json; charset=utf-8\r\ncontent-transfer-encoding: 8bit\r\n\r\n{\"a\": 1}\r\n--"
        ));

        let message =
            tokio_test::block_on(compose_to_vec(&composition, ComposeOptions::default())).unwrap();
        let message = String::from_utf8(message).unwrap();
        assert!(message.contains("content-transfer-encoding: quoted-printable\r\n"));
    }

    #[test]
    fn test_multipart_part_rejected() {
        let mut section = composition();
        section.add_text_section(MediaType::MultipartAlternative, "nested");
        let result = tokio_test::block_on(compose_to_vec(&section, ComposeOptions::default()));
        assert!(matches!(result, Err(Error::UnsupportedPartType(t)) if t == "multipart/alternative"));

        let mut attachment = composition();
        attachment.add_buffer_attachment("parts.eml", MediaType::MultipartMixed, "nested");
        let result = tokio_test::block_on(compose_to_vec(&attachment, ComposeOptions::default()));
        assert!(matches!(result, Err(Error::UnsupportedPartType(_))));
    }

    /// Passes input through and counts flushes.
    #[derive(Clone, Default)]
    struct CountingEncoder(Arc<AtomicUsize>);

    impl StreamEncoder for CountingEncoder {
        fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) {
            out.extend_from_slice(input);
        }

        fn finish(&mut self, out: &mut Vec<u8>) {
            self.0.fetch_add(1, Ordering::SeqCst);
            out.extend_from_slice(b"!");
        }
    }

    #[test]
    fn test_body_flushes_encoder_once() {
        let encoder = CountingEncoder::default();
        let mut body = Body::new(
            Source::Buffer(Bytes::from_static(b"ab")),
            Box::new(encoder.clone()),
            Resume::Section(1),
        );

        tokio_test::block_on(async {
            assert_eq!(body.next(1).await.unwrap().unwrap(), "a");
            assert_eq!(body.next(1).await.unwrap().unwrap(), "b");
            assert_eq!(body.next(1).await.unwrap().unwrap(), "!");
            assert!(body.next(1).await.unwrap().is_none());
            assert!(body.next(1).await.unwrap().is_none());
        });
        assert_eq!(encoder.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_attachments_precede_sections() {
        let mut composition = composition();
        composition.add_text_section(MediaType::TextPlain, "body");
        composition.add_buffer_attachment("a.txt", MediaType::TextPlain, "attached");

        let message = tokio_test::block_on(compose_to_vec(&composition, utf8())).unwrap();
        let message = String::from_utf8(message).unwrap();
        let attachment = message.find("attached").unwrap();
        let body = message.find("body").unwrap();
        assert!(attachment < body);
        assert!(message.contains("content-disposition: attachment; filename=a.txt; size=8;"));
    }

    #[test]
    fn test_small_read_chunks() {
        let mut composition = composition();
        composition.add_buffer_attachment("a.bin", MediaType::ApplicationOctetStream, vec![7u8; 100]);

        let options = ComposeOptions::builder().read_chunk_size(1).build().unwrap();
        let chunked = tokio_test::block_on(compose_to_vec(&composition, options)).unwrap();
        let whole = tokio_test::block_on(compose_to_vec(&composition, ComposeOptions::default())).unwrap();

        let close = format!("\r\n--{}--", composition.boundary());
        let body = |message: Vec<u8>| {
            let message = String::from_utf8(message).unwrap();
            let part = &message[message.find("content-disposition").unwrap()..];
            let start = part.find("\r\n\r\n").unwrap() + 4;
            let end = part.find(&close).unwrap();
            part[start..end].to_string()
        };
        assert_eq!(body(chunked), body(whole));
    }

    #[test]
    fn test_invalid_options() {
        let composition = composition();
        let options = ComposeOptions {
            read_chunk_size: 0,
            ..ComposeOptions::default()
        };
        assert!(matches!(Composer::new(&composition, options), Err(Error::Config(_))));
    }

    #[test]
    fn test_bytes_emitted() {
        let composition = composition();
        let mut composer = Composer::new(&composition, ComposeOptions::default()).unwrap();
        let mut total = 0;
        tokio_test::block_on(async {
            while let Some(chunk) = composer.next_chunk().await.unwrap() {
                total += chunk.len();
            }
        });
        assert_eq!(composer.bytes_emitted(), total);
    }
}
