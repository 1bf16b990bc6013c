//! Error types for message composition.

use std::path::PathBuf;

use thiserror::Error;

use crate::template::TemplateError;

/// Errors that can occur while building or encoding a composition.
#[derive(Debug, Error)]
pub enum Error {
    /// Header, address or encoder error from the codec layer.
    #[error(transparent)]
    Mime(#[from] mailcompose_mime::Error),

    /// File extension has no known media type.
    #[error("Unsupported file extension for {}", path.display())]
    UnsupportedExtension {
        /// Path of the rejected file.
        path: PathBuf,
    },

    /// Part media type cannot be composed, such as a nested multipart.
    #[error("Unsupported part type: {0}")]
    UnsupportedPartType(String),

    /// Template failed to render.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// I/O error while reading an attachment.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid composition options.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
