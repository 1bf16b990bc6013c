//! # mailcompose
//!
//! Streaming composition of multipart/mixed email messages.
//!
//! A [`Composition`] collects root headers, attachments and text sections.
//! [`compose`] turns it into a stream of [`bytes::Bytes`] chunks, reading
//! attachment files and rendering templates only when their part is reached,
//! so the full message is never held in memory.
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::TryStreamExt;
//! use mailcompose::{AddressList, ComposeOptions, Composition, Mailbox, MediaType, compose};
//!
//! # async fn example() -> mailcompose::Result<()> {
//! let mut composition = Composition::new("example.com");
//! composition.set_subject("Quarterly report");
//! composition.set_from(&AddressList::from(Mailbox::with_name("Reports", "reports@example.com")))?;
//! composition.set_to(&AddressList::from(Mailbox::new("team@example.com")))?;
//! composition.add_text_section(MediaType::TextPlain, "The report is attached.");
//! composition.add_file_attachment("q3.pdf", None)?;
//!
//! let options = ComposeOptions::builder().utf8_support(true).build()?;
//! let mut stream = Box::pin(compose(&composition, options)?);
//! while let Some(chunk) = stream.try_next().await? {
//!     // hand the chunk to the transport
//!     let _ = chunk;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod compose;
mod composition;
mod config;
mod error;
mod identifier;
mod part;
mod template;

pub use compose::{Composer, compose, compose_to_vec};
pub use composition::Composition;
pub use config::{ComposeOptions, ComposeOptionsBuilder, DEFAULT_MAX_LINE_LENGTH, DEFAULT_READ_CHUNK_SIZE};
pub use error::{Error, Result};
pub use identifier::{
    BOUNDARY_LENGTH, BOUNDARY_PREFIX, MESSAGE_ID_LENGTH, generate_boundary, generate_message_id,
};
pub use part::{Attachment, Section};
pub use template::{Locals, Template, TemplateError};

pub use mailcompose_mime::{
    AddressList, ContentDisposition, ContentType, FoldOptions, HeaderMap, Mailbox, MediaType,
    TransferEncoding,
};
