//! Error taxonomy for origin resolution, fetching and document typing.

use thiserror::Error;

/// Every failure the core can surface to a caller.
///
/// Intermediate 401/302 responses are never errors; the user agent consumes
/// its retry budget on those and hands back the last response instead.
#[derive(Debug, Error)]
pub enum NomsError {
    /// The reference is neither a URI, a `data:` form, nor a local path.
    #[error("malformed reference {reference:?}: {reason}")]
    MalformedReference { reference: String, reason: String },

    #[error("error parsing URL {reference} in context of {origin}: {source}")]
    UrlResolution {
        reference: String,
        origin: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{reference:?} not found: not a URL or bookmark (unsupported scheme {scheme:?})")]
    UnsupportedScheme { reference: String, scheme: String },

    #[error("data URLs must contain application/json (got {mime_type})")]
    UnsupportedDataType { mime_type: String },

    #[error("failed to request {origin}: {status} {reason}")]
    Fetch {
        origin: String,
        status: u32,
        reason: String,
    },

    #[error("can't follow redirect to {0}: too many redirects")]
    TooManyRedirects(String),

    #[error("bad redirect URL {0}")]
    BadRedirect(String),

    #[error("authentication failed for {url}: {reason}")]
    Authentication { url: String, reason: String },

    #[error("{0}: no such file")]
    NotFound(String),

    #[error("{0}: permission denied")]
    PermissionDenied(String),

    #[error("transport error: {0}")]
    Transport(#[from] curl::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON body: {0}")]
    JsonParse(#[from] serde_json::Error),
}

pub type Result<T, E = NomsError> = std::result::Result<T, E>;

impl NomsError {
    /// Map a filesystem error for `path` onto the file-origin variants.
    pub fn from_file_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => NomsError::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => NomsError::PermissionDenied(path.to_string()),
            _ => NomsError::Io(err),
        }
    }
}
