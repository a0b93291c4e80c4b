//! Credential provider boundary: identities produced in answer to a 401.
//!
//! The user agent only depends on [`CredentialProvider`]. [`FileCredentialStore`]
//! keeps identities in a JSON file under the XDG state dir and can fall back to
//! an interactive prompt; [`StaticCredentials`] hands out one fixed pair.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{NomsError, Result};
use crate::useragent::Response;

/// Credential tuple produced for an authentication challenge.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// `scheme://host[:port]` the credential is valid for.
    pub domain: String,
    /// Realm from `WWW-Authenticate`, empty if the server named none.
    #[serde(default)]
    pub realm: String,
    pub username: String,
    pub secret: String,
}

impl Identity {
    pub fn new(
        domain: impl Into<String>,
        realm: impl Into<String>,
        username: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            realm: realm.into(),
            username: username.into(),
            secret: secret.into(),
        }
    }

    /// Domain key for a URL: its serialized origin.
    pub fn domain_for(url: &Url) -> String {
        url.origin().ascii_serialization()
    }

    /// True if this identity may be sent along with a request to `url`.
    pub fn applies_to(&self, url: &Url) -> bool {
        Self::domain_for(url) == self.domain
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("domain", &self.domain)
            .field("realm", &self.realm)
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.username, self.domain)?;
        if !self.realm.is_empty() {
            write!(f, " ({})", self.realm)?;
        }
        Ok(())
    }
}

/// What a provider knows about the challenge it is answering.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub url: Url,
    pub domain: String,
    pub realm: String,
}

impl Challenge {
    pub fn from_response(url: &Url, response: &Response) -> Self {
        let realm = response
            .header("www-authenticate")
            .and_then(parse_realm)
            .unwrap_or_default();
        Self {
            url: url.clone(),
            domain: Identity::domain_for(url),
            realm,
        }
    }
}

/// Produces and persists identities for challenged requests.
pub trait CredentialProvider {
    /// Produce an identity for a request to `url` that was answered with the
    /// 401 `challenge`. Fails with [`NomsError::Authentication`] when no
    /// credentials can be produced.
    fn load(&mut self, url: &Url, challenge: &Response) -> Result<Identity>;

    /// Persist an identity that led to a successful request. Idempotent.
    fn save(&mut self, identity: &Identity) -> Result<()>;

    /// Called when a request chain ends, successful or not. Per-exchange
    /// state (identities already offered) is dropped here.
    fn finish_exchange(&mut self) {}
}

/// Extract `realm` from a `WWW-Authenticate` header value.
pub fn parse_realm(header: &str) -> Option<String> {
    let lower = header.to_ascii_lowercase();
    let start = lower.find("realm=")? + "realm=".len();
    let rest = &header[start..];
    let realm = if let Some(quoted) = rest.strip_prefix('"') {
        quoted.split('"').next().unwrap_or("")
    } else {
        rest.split([',', ' ']).next().unwrap_or("")
    };
    Some(realm.to_string())
}

/// Interactive fallback: returns `(username, secret)` or `None` when declined.
pub type Prompt = Box<dyn FnMut(&Challenge) -> Option<(String, String)> + Send>;

/// Identities persisted as JSON, with an optional interactive fallback.
pub struct FileCredentialStore {
    path: PathBuf,
    entries: Option<Vec<Identity>>,
    /// Stored identities already handed out and rejected in this session.
    tried: HashSet<(String, String, String)>,
    prompt: Option<Prompt>,
}

impl FileCredentialStore {
    /// Default path for the identity file: `~/.local/state/noms/identities.json`.
    pub fn default_path() -> anyhow::Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("noms")?;
        Ok(xdg_dirs.get_state_home().join("identities.json"))
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: None,
            tried: HashSet::new(),
            prompt: None,
        }
    }

    pub fn with_prompt(mut self, prompt: Prompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&mut self) -> Result<&mut Vec<Identity>> {
        if self.entries.is_none() {
            let loaded = match std::fs::read(&self.path) {
                Ok(bytes) => serde_json::from_slice(&bytes)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
                Err(e) => return Err(NomsError::Io(e)),
            };
            self.entries = Some(loaded);
        }
        Ok(self.entries.get_or_insert_with(Vec::new))
    }

    fn write(&self, entries: &[Identity]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }
}

impl CredentialProvider for FileCredentialStore {
    fn load(&mut self, url: &Url, challenge: &Response) -> Result<Identity> {
        let challenge = Challenge::from_response(url, challenge);

        let candidate = self
            .entries()?
            .iter()
            .find(|id| id.domain == challenge.domain && id.realm == challenge.realm)
            .cloned();
        if let Some(id) = &candidate {
            let key = (id.domain.clone(), id.realm.clone(), id.username.clone());
            if self.tried.insert(key) {
                tracing::debug!(identity = %id, "using stored identity");
                return Ok(id.clone());
            }
        }

        let Some(prompt) = self.prompt.as_mut() else {
            let reason = if candidate.is_some() {
                format!(
                    "stored credentials for {} were rejected and no prompt is available",
                    challenge.domain
                )
            } else {
                format!(
                    "no stored credentials for {} and no prompt available",
                    challenge.domain
                )
            };
            return Err(NomsError::Authentication {
                url: url.to_string(),
                reason,
            });
        };
        match prompt(&challenge) {
            Some((username, secret)) => Ok(Identity::new(
                challenge.domain,
                challenge.realm,
                username,
                secret,
            )),
            None => Err(NomsError::Authentication {
                url: url.to_string(),
                reason: "credentials prompt declined".to_string(),
            }),
        }
    }

    fn save(&mut self, identity: &Identity) -> Result<()> {
        let entries = self.entries()?;
        if entries.iter().any(|e| e == identity) {
            self.tried.clear();
            return Ok(());
        }
        entries.retain(|e| !(e.domain == identity.domain && e.realm == identity.realm));
        entries.push(identity.clone());
        let snapshot = entries.clone();
        self.write(&snapshot)?;
        self.tried.clear();
        tracing::debug!(identity = %identity, path = %self.path.display(), "saved identity");
        Ok(())
    }

    fn finish_exchange(&mut self) {
        self.tried.clear();
    }
}

/// One fixed username/secret for every challenge; nothing is persisted.
#[derive(Clone)]
pub struct StaticCredentials {
    username: String,
    secret: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl CredentialProvider for StaticCredentials {
    fn load(&mut self, url: &Url, challenge: &Response) -> Result<Identity> {
        let challenge = Challenge::from_response(url, challenge);
        Ok(Identity::new(
            challenge.domain,
            challenge.realm,
            self.username.clone(),
            self.secret.clone(),
        ))
    }

    fn save(&mut self, _identity: &Identity) -> Result<()> {
        Ok(())
    }
}

/// Provider that never has credentials; every challenge is final.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredentials;

impl CredentialProvider for NoCredentials {
    fn load(&mut self, url: &Url, _challenge: &Response) -> Result<Identity> {
        Err(NomsError::Authentication {
            url: url.to_string(),
            reason: "no credential provider configured".to_string(),
        })
    }

    fn save(&mut self, _identity: &Identity) -> Result<()> {
        Ok(())
    }
}
