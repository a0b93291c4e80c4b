//! Inline `data:` references: `data:[<mediatype>][;base64],<payload>`.

use base64::Engine;

use crate::error::{NomsError, Result};

/// MIME type assumed when a `data:` reference declares none.
const DEFAULT_DATA_TYPE: &str = "text/plain";

/// Decoded payload of a `data:` origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPayload {
    /// Media type without parameters, lowercased (e.g. `application/json`).
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// True if `reference` uses the `data:` scheme (case-insensitive).
pub(crate) fn is_data_reference(reference: &str) -> bool {
    reference
        .get(..5)
        .map(|s| s.eq_ignore_ascii_case("data:"))
        .unwrap_or(false)
}

pub(crate) fn parse_data_reference(reference: &str) -> Result<DataPayload> {
    let malformed = |reason: &str| NomsError::MalformedReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    };

    let rest = &reference[5..];
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| malformed("data reference has no ',' separator"))?;

    let mut params = header.split(';').map(str::trim);
    let mime_type = match params.next() {
        Some(t) if !t.is_empty() => t.to_ascii_lowercase(),
        _ => DEFAULT_DATA_TYPE.to_string(),
    };
    if !mime_type.contains('/') {
        return Err(malformed("data reference media type is not type/subtype"));
    }
    let is_base64 = params.any(|p| p.eq_ignore_ascii_case("base64"));

    let decoded = percent_decode(payload).ok_or_else(|| malformed("bad percent-escape"))?;
    let bytes = if is_base64 {
        let compact: Vec<u8> = decoded
            .into_iter()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| malformed(&format!("invalid base64 payload: {e}")))?
    } else {
        decoded
    };

    Ok(DataPayload { mime_type, bytes })
}

fn percent_decode(input: &str) -> Option<Vec<u8>> {
    let raw = input.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = raw.get(i + 1..i + 3)?;
            let hex = std::str::from_utf8(hex).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(raw[i]);
            i += 1;
        }
    }
    Some(out)
}
