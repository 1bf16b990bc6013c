//! Composition options.

use mailcompose_mime::FoldOptions;

use crate::error::{Error, Result};

/// Default line length for encoded bodies and folded headers.
pub const DEFAULT_MAX_LINE_LENGTH: usize = 76;

/// Default size of attachment reads.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 16 * 1024;

/// Options controlling how a composition is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ComposeOptions {
    /// Whether the transport accepts 8-bit UTF-8 bodies.
    pub utf8_support: bool,
    /// Maximum line length for encoded bodies and folded headers.
    pub max_line_length: usize,
    /// Number of bytes read from an attachment at a time.
    pub read_chunk_size: usize,
    /// Header folding indentation. Its line length is replaced by
    /// `max_line_length`.
    pub fold: FoldOptions,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            utf8_support: false,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            fold: FoldOptions::default(),
        }
    }
}

impl ComposeOptions {
    /// Creates the default options: 7-bit transport, 76 columns, 16 KiB reads.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an options builder.
    #[must_use]
    pub fn builder() -> ComposeOptionsBuilder {
        ComposeOptionsBuilder::new()
    }

    /// Folding options for message and part headers.
    ///
    /// Headers are always CRLF terminated so they can be concatenated.
    #[must_use]
    pub const fn header_fold(&self) -> FoldOptions {
        self.fold
            .with_max_line_length(self.max_line_length)
            .with_trailing_newline(true)
    }

    /// Checks the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the line length is below 4, the read size
    /// is zero, or the folding indentation does not fit the line length.
    pub fn validate(&self) -> Result<()> {
        if self.max_line_length < 4 {
            return Err(Error::Config(format!(
                "max line length must be at least 4, got {}",
                self.max_line_length
            )));
        }
        if self.read_chunk_size == 0 {
            return Err(Error::Config("read chunk size must be positive".to_string()));
        }
        self.header_fold()
            .validate()
            .map_err(|e| Error::Config(e.to_string()))
    }
}

/// Builder for composition options.
#[derive(Debug, Clone)]
pub struct ComposeOptionsBuilder {
    options: ComposeOptions,
}

impl ComposeOptionsBuilder {
    /// Creates a builder with the default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: ComposeOptions::default(),
        }
    }

    /// Sets whether the transport accepts 8-bit UTF-8 bodies.
    #[must_use]
    pub const fn utf8_support(mut self, enabled: bool) -> Self {
        self.options.utf8_support = enabled;
        self
    }

    /// Sets the maximum line length.
    #[must_use]
    pub const fn max_line_length(mut self, length: usize) -> Self {
        self.options.max_line_length = length;
        self
    }

    /// Sets the attachment read size.
    #[must_use]
    pub const fn read_chunk_size(mut self, size: usize) -> Self {
        self.options.read_chunk_size = size;
        self
    }

    /// Sets the header folding indentation.
    #[must_use]
    pub const fn fold(mut self, fold: FoldOptions) -> Self {
        self.options.fold = fold;
        self
    }

    /// Builds and validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options are inconsistent.
    pub fn build(self) -> Result<ComposeOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

impl Default for ComposeOptionsBuilder {
    fn default() -> Self {
        Self::new()
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
    fn test_defaults() {
        let options = ComposeOptions::new();
        assert!(!options.utf8_support);
        assert_eq!(options.max_line_length, 76);
        assert_eq!(options.read_chunk_size, 16384);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = ComposeOptions::builder()
            .utf8_support(true)
            .max_line_length(60)
            .read_chunk_size(10)
            .build()
            .unwrap();

        assert!(options.utf8_support);
        assert_eq!(options.max_line_length, 60);
        assert_eq!(options.read_chunk_size, 10);
        assert_eq!(options.header_fold().max_line_length, 60);
    }

    #[test]
    fn test_header_fold_forces_newline() {
        let options = ComposeOptions::builder()
            .fold(FoldOptions::default().with_trailing_newline(false))
            .build()
            .unwrap();
        assert!(options.header_fold().emit_trailing_newline);
    }

    #[test]
    fn test_builder_rejects_short_lines() {
        assert!(matches!(
            ComposeOptions::builder().max_line_length(3).build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_builder_rejects_zero_chunk() {
        assert!(matches!(
            ComposeOptions::builder().read_chunk_size(0).build(),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_builder_rejects_indent_wider_than_line() {
        // Default indentation is 8/9 columns, which leaves nothing at 9.
        assert!(matches!(
            ComposeOptions::builder().max_line_length(9).build(),
            Err(Error::Config(_))
        ));
        assert!(
            ComposeOptions::builder()
                .max_line_length(4)
                .fold(FoldOptions::default().with_indents(1, 2))
                .build()
                .is_ok()
        );
    }
}
