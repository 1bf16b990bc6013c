//! Body sections and attachments.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use mailcompose_mime::MediaType;

use crate::error::{Error, Result};
use crate::template::{Locals, Template};

/// A text body part.
#[derive(Clone)]
pub enum Section {
    /// Body bytes given up front.
    Buffer {
        /// Media type of the body.
        media_type: MediaType,
        /// Raw body.
        data: Bytes,
    },
    /// Body rendered from a template while the message is encoded.
    Template {
        /// Media type of the rendered body.
        media_type: MediaType,
        /// Template to render.
        template: Arc<dyn Template>,
        /// Values passed to the template.
        locals: Locals,
    },
}

impl Section {
    /// Returns the media type of the section.
    #[must_use]
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::Buffer { media_type, .. } | Self::Template { media_type, .. } => *media_type,
        }
    }

    /// Produces the body, rendering templates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if rendering fails.
    pub fn body(&self) -> Result<Bytes> {
        match self {
            Self::Buffer { data, .. } => Ok(data.clone()),
            Self::Template {
                template, locals, ..
            } => Ok(Bytes::from(template.render(locals)?)),
        }
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer { media_type, data } => f
                .debug_struct("Buffer")
                .field("media_type", media_type)
                .field("len", &data.len())
                .finish(),
            Self::Template {
                media_type, locals, ..
            } => f
                .debug_struct("Template")
                .field("media_type", media_type)
                .field("locals", locals)
                .finish_non_exhaustive(),
        }
    }
}

/// A named binary part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Attachment held in memory.
    Buffer {
        /// File name shown to the recipient.
        file_name: String,
        /// Media type of the data.
        media_type: MediaType,
        /// Raw data.
        data: Bytes,
    },
    /// Attachment read from disk while the message is encoded.
    File {
        /// File name shown to the recipient (final path component).
        file_name: String,
        /// Media type of the file.
        media_type: MediaType,
        /// Location of the file.
        path: PathBuf,
    },
}

impl Attachment {
    /// Creates an in-memory attachment.
    #[must_use]
    pub fn buffer(file_name: impl Into<String>, media_type: MediaType, data: impl Into<Bytes>) -> Self {
        Self::Buffer {
            file_name: file_name.into(),
            media_type,
            data: data.into(),
        }
    }

    /// Creates a file attachment.
    ///
    /// The file name is the final path component. Without an explicit media
    /// type it is looked up from the extension. The file itself is not
    /// touched until the message is encoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedExtension`] if no media type is given and
    /// the extension is missing or unknown.
    pub fn file(path: impl AsRef<Path>, media_type: Option<MediaType>) -> Result<Self> {
        let path = path.as_ref();
        let unsupported = || Error::UnsupportedExtension {
            path: path.to_path_buf(),
        };

        let media_type = match media_type {
            Some(media_type) => media_type,
            None => path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(MediaType::from_extension)
                .ok_or_else(unsupported)?,
        };

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(unsupported)?;

        Ok(Self::File {
            file_name,
            media_type,
            path: path.to_path_buf(),
        })
    }

    /// Returns the file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        match self {
            Self::Buffer { file_name, .. } | Self::File { file_name, .. } => file_name,
        }
    }

    /// Returns the media type.
    #[must_use]
    pub const fn media_type(&self) -> MediaType {
        match self {
            Self::Buffer { media_type, .. } | Self::File { media_type, .. } => *media_type,
        }
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
    use crate::template::TemplateError;

    #[test]
    fn test_file_infers_media_type() {
        let attachment = Attachment::file("/tmp/reports/q3.PDF", None).unwrap();
        assert_eq!(attachment.file_name(), "q3.PDF");
        assert_eq!(attachment.media_type(), MediaType::ApplicationPdf);
    }

    #[test]
    fn test_file_explicit_media_type() {
        let attachment = Attachment::file("notes", Some(MediaType::TextPlain)).unwrap();
        assert_eq!(attachment.file_name(), "notes");
        assert_eq!(attachment.media_type(), MediaType::TextPlain);
    }

    #[test]
    fn test_file_unsupported_extension() {
        assert!(matches!(
            Attachment::file("setup.exe", None),
            Err(Error::UnsupportedExtension { .. })
        ));
        assert!(matches!(
            Attachment::file("Makefile", None),
            Err(Error::UnsupportedExtension { .. })
        ));
    }

    #[test]
    fn test_buffer_attachment() {
        let attachment = Attachment::buffer("a.bin", MediaType::ApplicationOctetStream, vec![1, 2, 3]);
        assert_eq!(attachment.file_name(), "a.bin");
        assert_eq!(attachment.media_type(), MediaType::ApplicationOctetStream);
    }

    #[test]
    fn test_template_section_renders_lazily() {
        let mut locals = Locals::new();
        locals.insert("n".into(), 3.into());
        let section = Section::Template {
            media_type: MediaType::TextHtml,
            template: Arc::new(|locals: &Locals| -> std::result::Result<Vec<u8>, TemplateError> {
                Ok(format!("<b>{}</b>", locals["n"]).into_bytes())
            }),
            locals,
        };

        assert_eq!(section.media_type(), MediaType::TextHtml);
        assert_eq!(section.body().unwrap(), Bytes::from_static(b"<b>3</b>"));
    }

    #[test]
    fn test_template_section_error() {
        let section = Section::Template {
            media_type: MediaType::TextPlain,
            template: Arc::new(|_: &Locals| -> std::result::Result<Vec<u8>, TemplateError> {
                Err(TemplateError::new("no data"))
            }),
            locals: Locals::new(),
        };
        assert!(matches!(section.body(), Err(Error::Template(_))));
    }
}
