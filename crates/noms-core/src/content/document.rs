//! Typed documents: JSON objects tagged with `$doctype`.

use serde::Serialize;
use serde_json::{Map, Value};

pub const DOCTYPE_KEY: &str = "$doctype";
pub const BODY_KEY: &str = "$body";
pub const SCRIPT_KEY: &str = "$script";
pub const EXITCODE_KEY: &str = "$exitcode";
pub const SOURCE_KEY: &str = "$source";

/// One entry of a document's `$script` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Script {
    /// Inline source text.
    Inline(String),
    /// `{"$source": url}`, resolved against the origin.
    Source(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub doctype: String,
    pub body: Value,
    pub script: Vec<Script>,
    pub argv: Vec<String>,
    pub exitcode: i32,
}

impl Document {
    /// Build a document from a parsed object; `None` without a `$doctype`.
    ///
    /// The body is `$body` when present, otherwise the object minus the
    /// `$`-keys consumed here.
    pub fn from_object(mut object: Map<String, Value>, argv: Vec<String>) -> Option<Self> {
        let doctype = match object.remove(DOCTYPE_KEY)? {
            Value::String(s) => s,
            other => other.to_string(),
        };
        let script = object
            .remove(SCRIPT_KEY)
            .map(parse_scripts)
            .unwrap_or_default();
        let exitcode = match object.remove(EXITCODE_KEY) {
            Some(v) => v.as_i64().and_then(|n| i32::try_from(n).ok()).unwrap_or_else(|| {
                tracing::warn!("ignoring non-integer {}: {}", EXITCODE_KEY, v);
                0
            }),
            None => 0,
        };
        let body = object
            .remove(BODY_KEY)
            .unwrap_or(Value::Object(object));

        Some(Self {
            doctype,
            body,
            script,
            argv,
            exitcode,
        })
    }

    pub fn has_scripts(&self) -> bool {
        !self.script.is_empty()
    }
}

fn parse_scripts(value: Value) -> Vec<Script> {
    let entries = match value {
        Value::Array(items) => items,
        single => vec![single],
    };
    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::String(src) => Some(Script::Inline(src)),
            Value::Object(ref map) => match map.get(SOURCE_KEY) {
                Some(Value::String(url)) => Some(Script::Source(url.clone())),
                _ => {
                    tracing::warn!("ignoring script entry without {}: {}", SOURCE_KEY, entry);
                    None
                }
            },
            other => {
                tracing::warn!("ignoring unsupported script entry: {}", other);
                None
            }
        })
        .collect()
}
