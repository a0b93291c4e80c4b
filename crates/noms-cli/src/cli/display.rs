//! Turn a classified body into what goes to stdout.

use anyhow::{Context, Result};
use noms_core::content::mime;
use noms_core::content::{ParsedBody, RawBlob};

#[derive(Debug, PartialEq)]
pub enum Output {
    Text(String),
    Bytes(Vec<u8>),
    /// Binary content kept off an interactive terminal.
    Withheld,
}

/// `noms-raw` as YAML, documents as pretty JSON of their body, `text/*` as is.
/// Anything else is passed through only when stdout is not a terminal.
pub fn render_output(content_type: &str, body: &ParsedBody, is_tty: bool) -> Result<Output> {
    match body {
        ParsedBody::Typed(doc) => {
            let json = serde_json::to_string_pretty(&doc.body)
                .with_context(|| format!("format {} document", doc.doctype))?;
            Ok(Output::Text(json))
        }
        ParsedBody::Raw(RawBlob::Json(value)) => {
            let yaml = serde_yaml::to_string(value).context("format raw object as YAML")?;
            Ok(Output::Text(yaml))
        }
        ParsedBody::Raw(RawBlob::Bytes { bytes, .. }) if mime::is_text(content_type) => {
            Ok(Output::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
        ParsedBody::Raw(RawBlob::Bytes { .. }) if is_tty => Ok(Output::Withheld),
        ParsedBody::Raw(RawBlob::Bytes { bytes, .. }) => Ok(Output::Bytes(bytes.clone())),
    }
}
