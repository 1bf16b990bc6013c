#![allow(clippy::doc_markdown, clippy::uninlined_format_args)]
//! Example: Compose a message and write it to stdout
//!
//! Every path given on the command line is attached; its media type is
//! taken from the file extension.
//!
//! ## Running
//!
//! ```bash
//! RUST_LOG=mailcompose=debug cargo run --package mailcompose --example compose -- report.pdf
//! ```

use futures::TryStreamExt;
use mailcompose::{
    AddressList, ComposeOptions, Composition, Locals, Mailbox, MediaType, TemplateError, compose,
};
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn greeting(locals: &Locals) -> Result<Vec<u8>, TemplateError> {
    let name = locals
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| TemplateError::new("missing 'name'"))?;
    Ok(format!("<h1>Hello, {}!</h1>\n<p>Your files are attached.</p>\n", name).into_bytes())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailcompose=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut composition = Composition::new("example.com");
    composition.set_subject("Files you asked for");
    composition.set_from(&AddressList::from(Mailbox::with_name("Archive", "archive@example.com")))?;
    composition.set_to(&AddressList::from(Mailbox::with_name("Ada Lovelace", "ada@example.com")))?;
    composition.set_date(&chrono::Utc::now());
    composition.set_mailer("mailcompose example");

    let mut locals = Locals::new();
    locals.insert("name".into(), "Ada".into());
    composition.add_template_section(MediaType::TextHtml, greeting, locals);
    composition.add_text_section(MediaType::TextPlain, "Hello, Ada!\nYour files are attached.\n");

    for path in std::env::args().skip(1) {
        composition.add_file_attachment(&path, None)?;
        info!("Attaching {}", path);
    }

    let options = ComposeOptions::builder().utf8_support(true).build()?;
    let mut stream = Box::pin(compose(&composition, options)?);
    let mut stdout = tokio::io::stdout();
    while let Some(chunk) = stream.try_next().await? {
        stdout.write_all(&chunk).await?;
    }
    stdout.flush().await?;

    info!("Wrote message {}", composition.message_id());
    Ok(())
}
