//! Origin references: parsing, normalization and relative resolution.
//!
//! An origin is what a fetch is performed against: an `http(s)` URL, a local
//! file (given as `file:` URL or a bare path), or an inline `data:` payload.

mod data;

pub use data::DataPayload;

use std::fmt;
use std::path::Path;
use url::Url;

use crate::error::{NomsError, Result};

/// Host recorded for `file:` origins that name no host.
pub const LOCAL_HOST: &str = "localhost";

/// Parsed origin reference. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    reference: String,
    scheme: String,
    host: Option<String>,
    path: String,
    query: Option<String>,
    /// Absent only for `data:` references the URL parser refuses.
    url: Option<Url>,
    data: Option<DataPayload>,
}

impl Origin {
    /// Parse a reference string into an origin.
    ///
    /// Bare paths (no scheme) are made absolute against the current directory
    /// and become `file:` origins.
    pub fn parse(reference: &str) -> Result<Self> {
        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(malformed(reference, "empty reference"));
        }

        if data::is_data_reference(trimmed) {
            let payload = data::parse_data_reference(trimmed)?;
            return Ok(Self {
                reference: trimmed.to_string(),
                scheme: "data".to_string(),
                host: None,
                path: String::new(),
                query: None,
                url: Url::parse(trimmed).ok(),
                data: Some(payload),
            });
        }

        match Url::parse(trimmed) {
            Ok(url) => Ok(Self::from_url(url)),
            Err(url::ParseError::RelativeUrlWithoutBase) => Self::from_path(trimmed),
            Err(e) => Err(malformed(trimmed, &e.to_string())),
        }
    }

    /// Build an origin from an already parsed URL.
    pub fn from_url(url: Url) -> Self {
        let scheme = url.scheme().to_ascii_lowercase();
        let host = match url.host_str() {
            Some(h) if !h.is_empty() => Some(h.to_string()),
            _ if scheme == "file" => Some(LOCAL_HOST.to_string()),
            _ => None,
        };
        Self {
            reference: url.to_string(),
            scheme,
            host,
            path: url.path().to_string(),
            query: url.query().map(str::to_string),
            url: Some(url),
            data: None,
        }
    }

    fn from_path(reference: &str) -> Result<Self> {
        let path = Path::new(reference);
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let url = Url::from_file_path(&absolute)
            .map_err(|_| malformed(reference, "not a URL or an absolute file path"))?;
        Ok(Self::from_url(url))
    }

    /// The reference as given (trimmed), or the URL text for parsed URLs.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Lowercased scheme (`file`, `data`, `http`, `https`, ...).
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Percent-encoded path component (empty for `data:`).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Inline payload of a `data:` origin.
    pub fn data(&self) -> Option<&DataPayload> {
        self.data.as_ref()
    }

    pub fn is_http(&self) -> bool {
        matches!(self.scheme.as_str(), "http" | "https")
    }

    /// Join a reference against this origin. See [`resolve_absolute`].
    pub fn join(&self, reference: &str) -> Result<Url> {
        resolve_absolute(self, reference)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

/// Resolve `reference` against `origin`.
///
/// A reference that already carries a scheme is returned as parsed, without
/// consulting the origin.
pub fn resolve_absolute(origin: &Origin, reference: &str) -> Result<Url> {
    let resolution_error = |source| NomsError::UrlResolution {
        reference: reference.to_string(),
        origin: origin.to_string(),
        source,
    };

    match Url::parse(reference) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = origin
                .url()
                .ok_or_else(|| resolution_error(url::ParseError::RelativeUrlWithoutBase))?;
            base.join(reference).map_err(resolution_error)
        }
        Err(e) => Err(resolution_error(e)),
    }
}

fn malformed(reference: &str, reason: &str) -> NomsError {
    NomsError::MalformedReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    }
}
