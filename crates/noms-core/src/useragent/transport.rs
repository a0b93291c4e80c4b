//! Transport: one blocking HTTP exchange per call.
//!
//! [`CurlTransport`] uses a single libcurl easy handle, so connections and
//! cookies survive between requests of the same agent. libcurl's own redirect
//! following is off; the transport follows 301/303/307/308 itself and asks the
//! caller's approval for every target. 302 is always handed back to the agent.

use std::fmt;
use std::str;
use std::time::Duration;
use url::Url;

use super::response::RawResponse;
use crate::auth::Identity;
use crate::config::NomsConfig;
use crate::error::{NomsError, Result};

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request as handed to the transport.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub body: Option<Vec<u8>>,
    pub headers: Vec<(String, String)>,
}

/// Anything that can perform a single HTTP exchange.
pub trait Transport {
    /// Perform the request. Redirects other than 302 that the transport
    /// follows itself must pass `approve_redirect`; a rejected target fails
    /// with [`NomsError::BadRedirect`].
    fn send(
        &mut self,
        request: &TransportRequest,
        approve_redirect: &dyn Fn(&Url) -> bool,
    ) -> Result<RawResponse>;

    /// Install (or remove) the credential sent with subsequent requests.
    fn set_credentials(&mut self, identity: Option<Identity>);
}

/// Status codes the transport follows on its own.
pub fn is_transport_redirect(status: u32) -> bool {
    matches!(status, 301 | 303 | 307 | 308)
}

/// Tuning knobs for [`CurlTransport`], usually taken from [`NomsConfig`].
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub max_redirects: u32,
    pub verify_tls: bool,
    pub user_agent: String,
}

impl From<&NomsConfig> for CurlOptions {
    fn from(cfg: &NomsConfig) -> Self {
        Self {
            connect_timeout: cfg.connect_timeout(),
            timeout: cfg.timeout(),
            max_redirects: cfg.max_transport_redirects,
            verify_tls: cfg.verify_tls,
            user_agent: cfg.user_agent(),
        }
    }
}

impl Default for CurlOptions {
    fn default() -> Self {
        CurlOptions::from(&NomsConfig::default())
    }
}

/// Blocking libcurl transport.
pub struct CurlTransport {
    easy: curl::easy::Easy,
    opts: CurlOptions,
    identity: Option<Identity>,
}

impl CurlTransport {
    pub fn new(opts: CurlOptions) -> Self {
        Self {
            easy: curl::easy::Easy::new(),
            opts,
            identity: None,
        }
    }

    fn perform_once(&mut self, request: &TransportRequest) -> Result<RawResponse> {
        let easy = &mut self.easy;
        // reset() keeps live connections and the cookie store.
        easy.reset();
        easy.url(request.url.as_str())?;
        easy.follow_location(false)?;
        easy.cookie_file("")?;
        easy.useragent(&self.opts.user_agent)?;
        easy.connect_timeout(self.opts.connect_timeout)?;
        easy.timeout(self.opts.timeout)?;
        easy.ssl_verify_peer(self.opts.verify_tls)?;
        easy.ssl_verify_host(self.opts.verify_tls)?;

        match request.method {
            Method::Get => easy.get(true)?,
            Method::Head => easy.nobody(true)?,
            other => easy.custom_request(other.as_str())?,
        }
        if let Some(body) = &request.body {
            easy.post_fields_copy(body)?;
            if request.method != Method::Post {
                easy.custom_request(request.method.as_str())?;
            }
        }

        let mut list = curl::easy::List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !request.headers.is_empty() {
            easy.http_headers(list)?;
        }

        if let Some(identity) = self.identity.as_ref().filter(|id| id.applies_to(&request.url)) {
            let mut auth = curl::easy::Auth::new();
            auth.basic(true);
            easy.http_auth(&auth)?;
            easy.username(&identity.username)?;
            easy.password(&identity.secret)?;
        }

        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        let (reason, headers) = parse_header_block(&header_lines);
        Ok(RawResponse {
            url: request.url.clone(),
            status,
            reason,
            headers,
            body,
        })
    }
}

impl Transport for CurlTransport {
    fn send(
        &mut self,
        request: &TransportRequest,
        approve_redirect: &dyn Fn(&Url) -> bool,
    ) -> Result<RawResponse> {
        let mut current = request.clone();
        let mut hops = 0u32;
        loop {
            let raw = self.perform_once(&current)?;
            if !is_transport_redirect(raw.status) || hops >= self.opts.max_redirects {
                return Ok(raw);
            }
            let Some(location) = header_value(&raw.headers, "location") else {
                return Ok(raw);
            };
            let target = current
                .url
                .join(location)
                .map_err(|_| NomsError::BadRedirect(location.to_string()))?;
            if !approve_redirect(&target) {
                return Err(NomsError::BadRedirect(target.to_string()));
            }
            tracing::debug!(status = raw.status, %target, "transport following redirect");
            if raw.status == 303 {
                current.method = Method::Get;
                current.body = None;
            }
            current.url = target;
            hops += 1;
        }
    }

    fn set_credentials(&mut self, identity: Option<Identity>) {
        self.identity = identity;
    }
}

fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Split collected header lines into the reason phrase of the last status line
/// and the header fields that follow it.
pub(crate) fn parse_header_block(lines: &[String]) -> (String, Vec<(String, String)>) {
    let mut reason = String::new();
    let mut headers = Vec::new();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            // A new status line (after 100 Continue, for instance) starts a fresh block.
            reason = line.splitn(3, ' ').nth(2).unwrap_or("").trim().to_string();
            headers.clear();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    (reason, headers)
}
