//! End-to-end tests for message composition.
//!
//! Messages are composed into memory and taken apart again with the
//! boundary from the composition.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::{StreamExt, TryStreamExt};
use mailcompose::{
    AddressList, ComposeOptions, Composer, Composition, ContentDisposition, Error, HeaderMap,
    Locals, Mailbox, MediaType, TemplateError, compose, compose_to_vec,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn composition() -> Composition {
    Composition::with_rng("example.com", &mut StdRng::seed_from_u64(11))
}

fn utf8() -> ComposeOptions {
    ComposeOptions::builder().utf8_support(true).build().unwrap()
}

/// A part split into its decoded headers and raw body.
struct Part {
    headers: HeaderMap,
    body: String,
}

/// Splits a composed message into root headers and parts.
fn split_message(message: &[u8], boundary: &str) -> (HeaderMap, Vec<Part>) {
    let message = std::str::from_utf8(message).unwrap();
    let close = format!("\r\n--{boundary}--\r\n");
    let body = message.strip_suffix(&close).expect("closing delimiter");

    let delimiter = format!("\r\n--{boundary}\r\n");
    let mut pieces = body.split(&delimiter);
    let root = pieces.next().unwrap();

    let parts = pieces
        .map(|piece| {
            let (head, body) = piece.split_once("\r\n\r\n").expect("blank line after headers");
            Part {
                headers: HeaderMap::decode(head).unwrap(),
                body: body.to_string(),
            }
        })
        .collect();

    (HeaderMap::decode(root).unwrap(), parts)
}

fn decode_base64_body(body: &str) -> Vec<u8> {
    let lines: Vec<&str> = body.trim_end_matches("\r\n").split("\r\n").collect();
    for line in &lines[..lines.len() - 1] {
        assert_eq!(line.len(), 76);
    }
    STANDARD.decode(lines.concat()).unwrap()
}

#[tokio::test]
async fn test_empty_composition() {
    let mut composition = composition();
    composition.set_subject("Nothing here");

    let message = compose_to_vec(&composition, ComposeOptions::default()).await.unwrap();
    let text = String::from_utf8(message.clone()).unwrap();
    let close = format!("\r\n--{}--\r\n", composition.boundary());

    let root = composition
        .headers()
        .encode(&ComposeOptions::default().header_fold())
        .unwrap();
    assert_eq!(text, format!("{root}{close}"));

    let (headers, parts) = split_message(&message, composition.boundary());
    assert!(parts.is_empty());
    assert_eq!(headers.get("subject"), Some("Nothing here"));
}

#[tokio::test]
async fn test_base64_buffer_attachment() {
    let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
    let mut composition = composition();
    composition.add_buffer_attachment("blob.bin", MediaType::ApplicationOctetStream, data.clone());

    let message = compose_to_vec(&composition, ComposeOptions::default()).await.unwrap();
    let (_, parts) = split_message(&message, composition.boundary());
    assert_eq!(parts.len(), 1);

    let part = &parts[0];
    assert_eq!(part.headers.get("content-type"), Some("application/octet-stream"));
    assert_eq!(part.headers.get("content-transfer-encoding"), Some("base64"));

    let disposition = ContentDisposition::decode(part.headers.get("content-disposition").unwrap()).unwrap();
    assert_eq!(disposition.kind(), Some("attachment"));
    assert_eq!(disposition.filename().unwrap(), "blob.bin");
    assert_eq!(disposition.size().unwrap(), 1000);
    assert!(disposition.read_date().is_ok());

    assert_eq!(decode_base64_body(&part.body), data);
}

#[tokio::test]
async fn test_eight_bit_section() {
    let mut composition = composition();
    composition.add_text_section(MediaType::TextPlain, "Hello");

    let message = compose_to_vec(&composition, utf8()).await.unwrap();
    let (_, parts) = split_message(&message, composition.boundary());

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].headers.get("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(parts[0].headers.get("content-transfer-encoding"), Some("8bit"));
    assert_eq!(parts[0].body, "Hello");
}

#[tokio::test]
async fn test_file_attachment() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    let contents = "id,name\r\n1,caf\u{e9}\r\n".repeat(200);
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();

    let mut composition = composition();
    composition.add_file_attachment(file.path(), None).unwrap();

    let options = ComposeOptions::builder().read_chunk_size(1000).build().unwrap();
    let message = compose_to_vec(&composition, options).await.unwrap();
    let (_, parts) = split_message(&message, composition.boundary());

    let part = &parts[0];
    assert_eq!(part.headers.get("content-type"), Some("text/csv"));
    assert_eq!(part.headers.get("content-transfer-encoding"), Some("quoted-printable"));

    let disposition = ContentDisposition::decode(part.headers.get("content-disposition").unwrap()).unwrap();
    let file_name = file.path().file_name().unwrap().to_str().unwrap();
    assert_eq!(disposition.filename().unwrap(), file_name);
    assert_eq!(disposition.size().unwrap(), contents.len() as u64);
    let created = disposition.creation_date().unwrap();
    let modified = disposition.modification_date().unwrap();
    assert!(created <= disposition.read_date().unwrap());
    assert!(modified <= disposition.read_date().unwrap());
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let metadata = std::fs::metadata(file.path()).unwrap();
        assert_eq!(created.timestamp(), metadata.ctime());
    }

    for line in part.body.split("\r\n") {
        assert!(line.len() <= 76);
    }
    let decoded = mailcompose_mime::encoding::decode_quoted_printable(&part.body).unwrap();
    assert_eq!(decoded, contents.as_bytes());
}

#[tokio::test]
async fn test_missing_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut composition = composition();
    composition
        .add_file_attachment(dir.path().join("gone.pdf"), None)
        .unwrap();

    let result = compose_to_vec(&composition, ComposeOptions::default()).await;
    assert!(matches!(result, Err(Error::Io(_))));
}

#[tokio::test]
async fn test_early_drop_releases_file() {
    let mut file = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
    file.write_all(&[0u8; 64 * 1024]).unwrap();
    file.flush().unwrap();

    let mut composition = composition();
    composition.add_file_attachment(file.path(), None).unwrap();

    let options = ComposeOptions::builder().read_chunk_size(1024).build().unwrap();
    let stream = compose(&composition, options).unwrap();
    let first: Vec<_> = stream.take(3).collect().await;
    assert_eq!(first.len(), 3);
    assert!(first.iter().all(Result::is_ok));

    // The handle went away with the stream.
    let path = file.path().to_path_buf();
    file.close().unwrap();
    assert!(!path.exists());
}

#[test]
fn test_unsupported_extension() {
    let mut composition = composition();
    let err = composition.add_file_attachment("/tmp/run.exe", None).unwrap_err();
    assert!(matches!(err, Error::UnsupportedExtension { .. }));
    assert!(err.to_string().contains("run.exe"));
}

#[test]
fn test_too_many_from_addresses() {
    let mut composition = composition();
    let from = AddressList::new()
        .with(Mailbox::new("a@example.com"))
        .with(Mailbox::new("b@example.com"));

    let err = composition.set_from(&from).unwrap_err();
    assert!(matches!(
        err,
        Error::Mime(mailcompose_mime::Error::TooManyAddresses { header: "from", count: 2 })
    ));
}

#[tokio::test]
async fn test_full_message_layout() {
    let mut composition = composition();
    composition.set_subject("Weekly digest with a subject long enough to need folding across lines");
    composition
        .set_from(&AddressList::from(Mailbox::with_name("Digest Bot", "bot@example.com")))
        .unwrap();
    composition
        .set_to(
            &AddressList::new()
                .with(Mailbox::with_name("Ada", "ada@example.com"))
                .with(Mailbox::with_name("Lin, Grace", "grace@example.com")),
        )
        .unwrap();
    composition.set_mailer("mailcompose");
    composition.add_buffer_attachment("logo.png", MediaType::ImagePng, vec![0x89, b'P', b'N', b'G']);

    let mut locals = Locals::new();
    locals.insert("count".into(), 3.into());
    composition.add_template_section(
        MediaType::TextHtml,
        |locals: &Locals| -> Result<Vec<u8>, TemplateError> {
            Ok(format!("<p>{} new items</p>", locals["count"]).into_bytes())
        },
        locals,
    );
    composition.add_text_section(MediaType::TextPlain, "3 new items");

    let message = compose_to_vec(&composition, ComposeOptions::default()).await.unwrap();
    let text = std::str::from_utf8(&message).unwrap();
    for line in text.split("\r\n") {
        assert!(line.len() <= 76, "{line:?}");
    }

    let (root, parts) = split_message(&message, composition.boundary());
    assert_eq!(
        root.get("subject"),
        Some("Weekly digest with a subject long enough to need folding across lines")
    );
    assert_eq!(root.get("from"), Some("Digest Bot <bot@example.com>"));
    assert_eq!(
        root.get("to"),
        Some("Ada <ada@example.com>, \"Lin, Grace\" <grace@example.com>")
    );
    assert_eq!(root.get("message-id"), Some(composition.message_id()));

    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0].headers.get("content-type"), Some("image/png"));
    assert_eq!(decode_base64_body(&parts[0].body), vec![0x89, b'P', b'N', b'G']);
    assert_eq!(parts[1].headers.get("content-type"), Some("text/html; charset=utf-8"));
    assert_eq!(parts[1].body, "<p>3 new items</p>");
    assert_eq!(parts[2].body, "3 new items");
}

#[tokio::test]
async fn test_stream_matches_composer() {
    let mut composition = composition();
    composition.add_text_section(MediaType::TextPlain, "x".repeat(500));

    let streamed: Vec<u8> = compose(&composition, utf8())
        .unwrap()
        .try_fold(Vec::new(), |mut acc, chunk| async move {
            acc.extend_from_slice(&chunk);
            Ok(acc)
        })
        .await
        .unwrap();

    let mut composer = Composer::new(&composition, utf8()).unwrap();
    let mut pulled = Vec::new();
    while let Some(chunk) = composer.next_chunk().await.unwrap() {
        assert!(!chunk.is_empty());
        pulled.extend_from_slice(&chunk);
    }

    assert_eq!(streamed, pulled);
}

#[tokio::test]
async fn test_stream_ends_after_error() {
    let mut composition = composition();
    composition.add_template_section(
        MediaType::TextHtml,
        |_: &Locals| -> Result<Vec<u8>, TemplateError> { Err(TemplateError::new("missing 'name'")) },
        Locals::new(),
    );
    composition.add_text_section(MediaType::TextPlain, "never reached");

    let items: Vec<_> = compose(&composition, utf8()).unwrap().collect().await;
    assert_eq!(items.len(), 2);
    assert!(items[0].is_ok());
    assert!(matches!(&items[1], Err(Error::Template(e)) if e.to_string().contains("missing 'name'")));
}

#[tokio::test]
async fn test_any_section_type_is_text() {
    let mut composition = composition();
    composition.add_text_section(MediaType::ImageSvg, "<svg/>");
    composition.add_text_section(MediaType::ApplicationJson, "{}");

    let message = compose_to_vec(&composition, ComposeOptions::default()).await.unwrap();
    let (_, parts) = split_message(&message, composition.boundary());

    assert_eq!(parts.len(), 2);
    assert_eq!(parts[0].headers.get("content-type"), Some("image/svg+xml; charset=utf-8"));
    assert_eq!(parts[0].headers.get("content-transfer-encoding"), Some("quoted-printable"));
    assert_eq!(parts[0].body, "<svg/>");
    assert_eq!(parts[1].headers.get("content-type"), Some("application/json; charset=utf-8"));
    assert_eq!(parts[1].body, "{}");
}
