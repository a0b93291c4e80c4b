//! Uniform read-only view over one transport reply.

use std::collections::BTreeMap;
use url::Url;

/// Reply as produced by a [`Transport`](super::Transport), before wrapping.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// URL that produced this reply (after any transport-level redirects).
    pub url: Url,
    pub status: u32,
    /// Reason phrase from the status line; may be empty (e.g. HTTP/2).
    pub reason: String,
    /// Header lines in arrival order, names as sent.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Header names lowercased, values in arrival order.
pub type HeaderMap = BTreeMap<String, Vec<String>>;

/// Normalized response: status, reason, headers, body and declared content type.
#[derive(Debug, Clone)]
pub struct Response {
    url: Url,
    status: u32,
    reason: String,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl From<RawResponse> for Response {
    fn from(raw: RawResponse) -> Self {
        let mut headers = HeaderMap::new();
        for (name, value) in raw.headers {
            headers
                .entry(name.trim().to_ascii_lowercase())
                .or_default()
                .push(value.trim().to_string());
        }
        let reason = if raw.reason.trim().is_empty() {
            canonical_reason(raw.status).to_string()
        } else {
            raw.reason.trim().to_string()
        };
        Self {
            url: raw.url,
            status: raw.status,
            reason,
            headers,
            body: raw.body,
        }
    }
}

impl Response {
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, replacing invalid UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// True iff the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of header `name`, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn status(&self) -> u32 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// `"<code> <reason>"`, e.g. `"404 Not Found"`.
    pub fn status_text(&self) -> String {
        format!("{} {}", self.status, self.reason)
    }

    /// Declared `Content-Type`, parameters included.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Declared MIME type without parameters, lowercased.
    pub fn mime_type(&self) -> Option<String> {
        self.content_type()
            .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .filter(|ct| !ct.is_empty())
    }

    /// URL that produced this response.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

/// Reason phrase for status lines that carry none.
pub fn canonical_reason(status: u32) -> &'static str {
    match status {
        100 => "Continue",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown",
    }
}
