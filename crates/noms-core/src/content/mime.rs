//! MIME type helpers: extension guessing and type-family checks.

use std::path::Path;

/// Type used when nothing better is known.
pub const DEFAULT_TYPE: &str = "text/plain";

/// Marker type for JSON content without a `$doctype`.
pub const NOMS_RAW: &str = "noms-raw";

const EXTENSIONS: &[(&str, &str)] = &[
    ("json", "application/json"),
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("yaml", "application/x-yaml"),
    ("yml", "application/x-yaml"),
    ("toml", "application/toml"),
    ("xml", "application/xml"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("md", "text/markdown"),
    ("txt", "text/plain"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("pdf", "application/pdf"),
    ("gz", "application/gzip"),
    ("zip", "application/zip"),
];

/// Guess a MIME type from the file extension of `path`; [`DEFAULT_TYPE`] if unknown.
pub fn guess_from_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| {
            EXTENSIONS
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(ext))
                .map(|(_, mime)| *mime)
        })
        .unwrap_or(DEFAULT_TYPE)
}

/// `"Application/JSON; charset=utf-8"` -> `"application/json"`.
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

fn is_family(content_type: &str, subtype: &str) -> bool {
    let essence = essence(content_type);
    let Some(sub) = essence
        .strip_prefix("application/")
        .or_else(|| essence.strip_prefix("text/"))
    else {
        return false;
    };
    sub.strip_prefix("x-").unwrap_or(sub).starts_with(subtype)
}

/// `application/json`, `text/json`, `application/x-json` and `text/x-json`,
/// parameters allowed.
pub fn is_json(content_type: &str) -> bool {
    is_family(content_type, "json")
}

/// `application/javascript`, `text/javascript` and their `x-` forms.
pub fn is_javascript(content_type: &str) -> bool {
    is_family(content_type, "javascript")
}

/// `text/...` types, which are safe to print as-is.
pub fn is_text(content_type: &str) -> bool {
    let essence = essence(content_type);
    essence == "text" || essence.starts_with("text/")
}
