//! User agent: the fetch / authenticate / redirect protocol.
//!
//! A request runs as a bounded loop over one retry budget. Each 401 answered
//! with fresh credentials and each followed 302 consumes one unit; credential
//! lookups are additionally capped per request. When the budget runs out on a
//! 401 the challenge is returned as the terminal response, when it runs out on
//! an approved 302 the request fails with [`NomsError::TooManyRedirects`].
//!
//! A `UserAgent` owns its transport, installed credential and redirect checks
//! and every operation takes `&mut self`; concurrent fetches need one agent
//! each, or an external lock around a shared one.

mod redirect;
mod response;
mod transport;

pub use redirect::{same_origin, RedirectCheck, RedirectChecks};
pub use response::{canonical_reason, HeaderMap, RawResponse, Response};
pub use transport::{
    is_transport_redirect, CurlOptions, CurlTransport, Method, Transport, TransportRequest,
};

use url::Url;

use crate::auth::{CredentialProvider, Identity};
use crate::config::NomsConfig;
use crate::error::{NomsError, Result};
use crate::origin::{resolve_absolute, Origin};

/// Retry budget of a plain [`UserAgent::get`].
pub const DEFAULT_TRIES: u32 = 10;

/// Credential lookups allowed within one logical request.
pub const DEFAULT_MAX_AUTH_ATTEMPTS: u32 = 3;

pub struct UserAgent<T: Transport = CurlTransport> {
    origin: Origin,
    transport: T,
    credentials: Box<dyn CredentialProvider + Send>,
    redirect_checks: RedirectChecks,
    /// Identity that last led to a successful request; reused until challenged.
    identity: Option<Identity>,
    default_tries: u32,
    max_auth_attempts: u32,
}

impl UserAgent<CurlTransport> {
    /// Agent backed by libcurl, tuned from `cfg`.
    pub fn new(
        origin: Origin,
        cfg: &NomsConfig,
        credentials: Box<dyn CredentialProvider + Send>,
    ) -> Self {
        UserAgent::with_transport(origin, CurlTransport::new(CurlOptions::from(cfg)), credentials)
            .with_default_tries(cfg.max_tries)
            .with_max_auth_attempts(cfg.max_auth_attempts)
    }
}

impl<T: Transport> UserAgent<T> {
    pub fn with_transport(
        origin: Origin,
        transport: T,
        credentials: Box<dyn CredentialProvider + Send>,
    ) -> Self {
        Self {
            origin,
            transport,
            credentials,
            redirect_checks: RedirectChecks::new(),
            identity: None,
            default_tries: DEFAULT_TRIES,
            max_auth_attempts: DEFAULT_MAX_AUTH_ATTEMPTS,
        }
    }

    pub fn with_default_tries(mut self, tries: u32) -> Self {
        self.default_tries = tries;
        self
    }

    pub fn with_max_auth_attempts(mut self, attempts: u32) -> Self {
        self.max_auth_attempts = attempts;
        self
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn set_origin(&mut self, origin: Origin) {
        tracing::debug!("setting my origin to {}", origin);
        self.origin = origin;
    }

    /// Identity cached from the last authenticated success, if any.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve `reference` against the agent's current origin.
    pub fn absolute_url(&self, reference: &str) -> Result<Url> {
        tracing::debug!(
            "calculating absolute url of {} in context of {}",
            reference,
            self.origin
        );
        resolve_absolute(&self.origin, reference)
    }

    pub fn add_redirect_check<F>(&mut self, check: F)
    where
        F: Fn(&Url) -> bool + Send + 'static,
    {
        tracing::debug!("adding redirect check #{}", self.redirect_checks.len() + 1);
        self.redirect_checks.push(Box::new(check));
    }

    pub fn clear_redirect_checks(&mut self) {
        tracing::debug!("clearing redirect checks");
        self.redirect_checks.clear();
    }

    /// Remove the most recently added redirect check; `None` if there is none.
    pub fn pop_redirect_check(&mut self) -> Option<RedirectCheck> {
        let popped = self.redirect_checks.pop();
        if popped.is_some() {
            tracing::debug!("popped redirect check #{}", self.redirect_checks.len() + 1);
        }
        popped
    }

    pub fn check_redirect(&self, candidate: &Url) -> bool {
        self.redirect_checks.approve(candidate)
    }

    /// GET `url` with the default retry budget.
    pub fn get(&mut self, url: &str, headers: &[(String, String)]) -> Result<(Response, Url)> {
        let tries = self.default_tries;
        self.request(Method::Get, url, None, headers, tries, None)
    }

    /// Perform `method` on `url`, answering 401 challenges through the
    /// credential provider and following approved 302s, within `tries`.
    ///
    /// Returns the terminal response and the URL that produced it. A 401 that
    /// outlives the budget is returned, not raised; callers inspect the status.
    pub fn request(
        &mut self,
        method: Method,
        url: &str,
        data: Option<&[u8]>,
        headers: &[(String, String)],
        tries: u32,
        identity: Option<Identity>,
    ) -> Result<(Response, Url)> {
        let outcome = self.run_chain(method, url, data, headers, tries, identity);
        self.credentials.finish_exchange();
        outcome
    }

    fn run_chain(
        &mut self,
        method: Method,
        url: &str,
        data: Option<&[u8]>,
        headers: &[(String, String)],
        tries: u32,
        identity: Option<Identity>,
    ) -> Result<(Response, Url)> {
        let mut req_url = self.absolute_url(url)?;
        let mut remaining = tries;
        let mut auth_attempts = 0u32;
        // Identity supplied or acquired in this call chain; saved on success.
        let mut acquired = identity;

        let response = loop {
            let active = acquired.clone().or_else(|| self.identity.clone());
            self.transport.set_credentials(active);

            tracing::debug!(
                method = %method,
                url = %req_url,
                headers = ?headers.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
                remaining,
                "request"
            );
            let request = TransportRequest {
                method,
                url: req_url.clone(),
                body: data.map(<[u8]>::to_vec),
                headers: headers.to_vec(),
            };
            let checks = &self.redirect_checks;
            let raw = self
                .transport
                .send(&request, &|candidate: &Url| checks.approve(candidate))?;
            if raw.url != req_url {
                req_url = raw.url.clone();
            }
            let response = Response::from(raw);
            tracing::debug!(
                status = response.status(),
                reason = response.reason(),
                bytes = response.body().len(),
                content_type = response.content_type().unwrap_or("-"),
                "-> response"
            );
            tracing::trace!(headers = ?response.headers(), "response headers");

            match response.status() {
                401 => {
                    if remaining == 0 || auth_attempts >= self.max_auth_attempts {
                        tracing::debug!(
                            auth_attempts,
                            remaining,
                            "authentication retries exhausted for {}",
                            req_url
                        );
                        break response;
                    }
                    tracing::debug!("handling unauthorized: loading identity for {}", req_url);
                    let id = match self.credentials.load(&req_url, &response) {
                        Ok(id) => id,
                        // Credentials already went out in this chain and were refused.
                        Err(e) if acquired.is_some() => {
                            tracing::debug!("no further credentials for {}: {}", req_url, e);
                            break response;
                        }
                        Err(e) => return Err(e),
                    };
                    auth_attempts += 1;
                    remaining -= 1;
                    acquired = Some(id);
                }
                302 => {
                    let Some(location) = response.header("location") else {
                        break response;
                    };
                    let candidate =
                        req_url
                            .join(location)
                            .map_err(|source| NomsError::UrlResolution {
                                reference: location.to_string(),
                                origin: req_url.to_string(),
                                source,
                            })?;
                    if !self.redirect_checks.approve(&candidate) {
                        tracing::debug!("redirect to {} rejected by policy", candidate);
                        break response;
                    }
                    if remaining == 0 {
                        return Err(NomsError::TooManyRedirects(candidate.to_string()));
                    }
                    tracing::debug!("redirect to {}", candidate);
                    remaining -= 1;
                    req_url = candidate;
                }
                _ => break response,
            }
        };

        if let Some(id) = acquired {
            if response.is_success() {
                tracing::debug!("login succeeded, saving {}", id);
                if let Err(e) = self.credentials.save(&id) {
                    tracing::warn!("could not save identity {}: {}", id, e);
                }
                self.identity = Some(id);
            }
        }

        tracing::debug!("<- {} <- {}", response.status_text(), req_url);
        Ok((response, req_url))
    }

    /// Wait for outstanding asynchronous requests. Every request is currently
    /// synchronous, so there is never anything to wait for.
    pub fn wait(&mut self) -> Vec<Response> {
        Vec::new()
    }
}
