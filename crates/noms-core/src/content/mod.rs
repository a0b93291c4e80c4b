//! Content resolution: fetch an origin, then classify what came back.
//!
//! [`Application`] picks the retrieval path by the origin's scheme, derives a
//! MIME type, and turns JSON bodies into either a typed [`Document`] (when a
//! `$doctype` is present) or an opaque `noms-raw` value.

mod document;
pub mod mime;

pub use document::{Document, Script, BODY_KEY, DOCTYPE_KEY, EXITCODE_KEY, SCRIPT_KEY, SOURCE_KEY};

use std::path::PathBuf;

use serde_json::Value;

use crate::auth::CredentialProvider;
use crate::config::NomsConfig;
use crate::error::{NomsError, Result};
use crate::origin::{DataPayload, Origin};
use crate::script::ScriptExecutor;
use crate::useragent::{CurlTransport, Response, Transport, UserAgent};

/// What a fetch produced, before any interpretation.
#[derive(Debug, Clone)]
pub enum FetchedContent {
    File { path: PathBuf, bytes: Vec<u8> },
    Data(DataPayload),
    Http(Response),
}

impl FetchedContent {
    pub fn bytes(&self) -> &[u8] {
        match self {
            FetchedContent::File { bytes, .. } => bytes,
            FetchedContent::Data(payload) => &payload.bytes,
            FetchedContent::Http(response) => response.body(),
        }
    }
}

/// Content with no document type attached.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBlob {
    /// Parsed JSON without a `$doctype` (type `noms-raw`).
    Json(Value),
    /// Bytes of a non-JSON type, left uninterpreted.
    Bytes { mime_type: String, bytes: Vec<u8> },
}

/// Result of classifying fetched content.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Raw(RawBlob),
    Typed(Document),
}

/// One noms invocation: origin, arguments, and the agent that fetches for it.
pub struct Application<T: Transport = CurlTransport> {
    origin: Origin,
    argv: Vec<String>,
    useragent: UserAgent<T>,
    content_type: Option<String>,
    body: Option<ParsedBody>,
}

impl Application<CurlTransport> {
    pub fn new(
        origin: Origin,
        argv: Vec<String>,
        cfg: &NomsConfig,
        credentials: Box<dyn CredentialProvider + Send>,
    ) -> Self {
        let useragent = UserAgent::new(origin.clone(), cfg, credentials);
        Application::with_useragent(origin, argv, useragent)
    }
}

impl<T: Transport> Application<T> {
    pub fn with_useragent(origin: Origin, argv: Vec<String>, useragent: UserAgent<T>) -> Self {
        tracing::debug!(
            "application {} has origin: {}",
            argv.first().map(String::as_str).unwrap_or("-"),
            origin
        );
        Self {
            origin,
            argv,
            useragent,
            content_type: None,
            body: None,
        }
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    pub fn useragent(&self) -> &UserAgent<T> {
        &self.useragent
    }

    pub fn useragent_mut(&mut self) -> &mut UserAgent<T> {
        &mut self.useragent
    }

    /// Resolved type: the doctype, `noms-raw`, or the transport MIME type.
    /// `None` until [`fetch`](Self::fetch) has succeeded.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn body(&self) -> Option<&ParsedBody> {
        self.body.as_ref()
    }

    pub fn document(&self) -> Option<&Document> {
        match &self.body {
            Some(ParsedBody::Typed(doc)) => Some(doc),
            _ => None,
        }
    }

    /// Exit code of the document, 0 when there is none.
    pub fn exit_code(&self) -> i32 {
        self.document().map(|d| d.exitcode).unwrap_or(0)
    }

    /// Retrieve the origin and classify the result.
    pub fn fetch(&mut self) -> Result<&ParsedBody> {
        let (mime_type, content) = self.retrieve()?;
        let (content_type, parsed) = self.classify(mime_type, content)?;
        tracing::debug!("treating {} as {}", self.origin, content_type);
        self.content_type = Some(content_type);
        Ok(self.body.insert(parsed))
    }

    fn retrieve(&mut self) -> Result<(String, FetchedContent)> {
        match self.origin.scheme() {
            "file" => {
                let path = self
                    .origin
                    .url()
                    .and_then(|u| u.to_file_path().ok())
                    .ok_or_else(|| NomsError::MalformedReference {
                        reference: self.origin.to_string(),
                        reason: "not a local file path".to_string(),
                    })?;
                let bytes = std::fs::read(&path)
                    .map_err(|e| NomsError::from_file_io(&path.display().to_string(), e))?;
                let mime_type = mime::guess_from_path(&path).to_string();
                Ok((mime_type, FetchedContent::File { path, bytes }))
            }
            "data" => {
                let payload = self.origin.data().cloned().ok_or_else(|| {
                    NomsError::MalformedReference {
                        reference: self.origin.to_string(),
                        reason: "data reference without payload".to_string(),
                    }
                })?;
                if payload.mime_type != "application/json" {
                    return Err(NomsError::UnsupportedDataType {
                        mime_type: payload.mime_type,
                    });
                }
                Ok((payload.mime_type.clone(), FetchedContent::Data(payload)))
            }
            "http" | "https" => {
                let reference = self.origin.reference().to_string();
                let (response, _) = self.useragent.get(&reference, &[])?;
                if !response.is_success() {
                    return Err(NomsError::Fetch {
                        origin: reference,
                        status: response.status(),
                        reason: response.reason().to_string(),
                    });
                }
                let mime_type = response
                    .mime_type()
                    .unwrap_or_else(|| mime::DEFAULT_TYPE.to_string());
                Ok((mime_type, FetchedContent::Http(response)))
            }
            other => Err(NomsError::UnsupportedScheme {
                reference: self.origin.to_string(),
                scheme: other.to_string(),
            }),
        }
    }

    fn classify(&self, mime_type: String, content: FetchedContent) -> Result<(String, ParsedBody)> {
        if !mime::is_json(&mime_type) {
            let bytes = match content {
                FetchedContent::File { bytes, .. } => bytes,
                FetchedContent::Data(payload) => payload.bytes,
                FetchedContent::Http(response) => response.into_body(),
            };
            let raw = RawBlob::Bytes {
                mime_type: mime_type.clone(),
                bytes,
            };
            return Ok((mime_type, ParsedBody::Raw(raw)));
        }

        let value: Value = serde_json::from_slice(content.bytes())?;
        match value {
            Value::Object(object) if object.contains_key(DOCTYPE_KEY) => {
                let doc = Document::from_object(object, self.argv.clone()).ok_or_else(|| {
                    NomsError::MalformedReference {
                        reference: self.origin.to_string(),
                        reason: format!("{DOCTYPE_KEY} vanished while parsing"),
                    }
                })?;
                tracing::debug!("treating as {} document", doc.doctype);
                Ok((doc.doctype.clone(), ParsedBody::Typed(doc)))
            }
            other => {
                tracing::debug!("treating as raw object (no '{}')", DOCTYPE_KEY);
                Ok((mime::NOMS_RAW.to_string(), ParsedBody::Raw(RawBlob::Json(other))))
            }
        }
    }

    /// Run the document's scripts through `executor`.
    ///
    /// `$source` scripts are fetched through the user agent relative to the
    /// origin. Failed fetches, non-JavaScript types and evaluation errors are
    /// logged and skipped. Nothing happens without a document.
    pub fn render(&mut self, executor: &mut dyn ScriptExecutor) {
        let Some(ParsedBody::Typed(document)) = &self.body else {
            return;
        };
        for script in &document.script {
            let source = match script {
                Script::Inline(src) => src.clone(),
                Script::Source(url) => match fetch_script(&mut self.useragent, url) {
                    Some(src) => src,
                    None => continue,
                },
            };
            if let Err(e) = executor.eval(&source, document) {
                tracing::warn!("script error: {:#}", e);
            }
        }
    }
}

fn fetch_script<T: Transport>(useragent: &mut UserAgent<T>, url: &str) -> Option<String> {
    let response = match useragent.get(url, &[]) {
        Ok((response, _)) => response,
        Err(e) => {
            tracing::warn!("couldn't load script from {:?}: {}", url, e);
            return None;
        }
    };
    if !response.is_success() {
        tracing::warn!(
            "couldn't load script from {:?}: {}",
            url,
            response.status_text()
        );
        tracing::debug!("body of unsuccessful request: {}", response.text());
        return None;
    }
    match response.content_type() {
        Some(ct) if mime::is_javascript(ct) => Some(response.text()),
        other => {
            tracing::warn!(
                "unsupported script type {:?} for script from {:?}",
                other,
                url
            );
            None
        }
    }
}
