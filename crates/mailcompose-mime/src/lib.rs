//! # mailcompose-mime
//!
//! Header and body codecs for composing MIME messages.
//!
//! ## Features
//!
//! - **Header folding**: reversible wrapping of long header values
//! - **Header values**: `content-type` and `content-disposition` with
//!   parameters, address lists
//! - **Transfer encodings**: streaming Base64, Quoted-Printable and
//!   pass-through encoders that accept input in any chunking
//!
//! ## Quick Start
//!
//! ### Folding Headers
//!
//! ```
//! use mailcompose_mime::{FoldOptions, fold_decode, fold_encode};
//!
//! let options = FoldOptions::default().with_max_line_length(40);
//! let folded = fold_encode("subject", "a subject that is too long for one line", &options)?;
//! assert!(folded.lines().all(|line| line.len() <= 40));
//!
//! let (key, value) = fold_decode(&folded)?;
//! assert_eq!(key, "subject");
//! assert_eq!(value, "a subject that is too long for one line");
//! # Ok::<(), mailcompose_mime::Error>(())
//! ```
//!
//! ### Header Values
//!
//! ```
//! use mailcompose_mime::{ContentType, MediaType};
//!
//! let content_type = ContentType::utf8(MediaType::TextPlain);
//! assert_eq!(content_type.encode(), "text/plain; charset=utf-8");
//!
//! let decoded = ContentType::decode("multipart/mixed; boundary=\"a b\"")?;
//! assert_eq!(decoded.boundary(), Some("a b"));
//! # Ok::<(), mailcompose_mime::Error>(())
//! ```
//!
//! ### Streaming Encoders
//!
//! ```
//! use mailcompose_mime::encoding::{Base64Encoder, StreamEncoder};
//!
//! let mut encoder = Base64Encoder::new(Some(76))?;
//! let mut out = Vec::new();
//! encoder.feed(b"Hello, ", &mut out);
//! encoder.feed(b"World!", &mut out);
//! encoder.finish(&mut out);
//! assert_eq!(out, b"SGVsbG8sIFdvcmxkIQ==\r\n");
//! # Ok::<(), mailcompose_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod error;
mod fold;
mod header;
mod media_type;
mod transfer_encoding;

pub mod encoding;

pub use address::{AddressList, Mailbox};
pub use content_type::{ContentDisposition, ContentType, DispositionKind, MappedHeaderValue};
pub use error::{Error, Result};
pub use fold::{FoldOptions, fold_decode, fold_encode, validate_key};
pub use header::HeaderMap;
pub use media_type::MediaType;
pub use transfer_encoding::TransferEncoding;
