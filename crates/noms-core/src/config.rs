use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable that turns on verbose request/response tracing.
pub const DEBUG_ENV: &str = "NOMS_DEBUG";

/// Global configuration loaded from `~/.config/noms/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NomsConfig {
    /// Trace every request/response pair at debug level.
    #[serde(default)]
    pub debug: bool,
    /// Retry budget for one logical fetch (auth retries and redirect hops).
    pub max_tries: u32,
    /// Upper bound on credential lookups within one logical fetch.
    pub max_auth_attempts: u32,
    /// Connect timeout per transport call, in seconds.
    pub connect_timeout_secs: u64,
    /// Total deadline per transport call, in seconds.
    pub timeout_secs: u64,
    /// Hop limit for redirects the transport follows on its own (301/303/307/308).
    pub max_transport_redirects: u32,
    /// Verify TLS peer certificates and host names.
    pub verify_tls: bool,
    /// Optional `User-Agent` override; defaults to `noms/<version>`.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Write logs to `~/.local/state/noms/noms.log` instead of stderr.
    #[serde(default)]
    pub log_to_file: bool,
}

impl Default for NomsConfig {
    fn default() -> Self {
        Self {
            debug: false,
            max_tries: 10,
            max_auth_attempts: 3,
            connect_timeout_secs: 15,
            timeout_secs: 60,
            max_transport_redirects: 10,
            verify_tls: true,
            user_agent: None,
            log_to_file: false,
        }
    }
}

impl NomsConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("noms/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Apply `NOMS_DEBUG`: any non-empty value enables debug tracing.
    pub fn apply_env(mut self) -> Self {
        if debug_from_env(std::env::var(DEBUG_ENV).ok().as_deref()) {
            self.debug = true;
        }
        self
    }
}

fn debug_from_env(value: Option<&str>) -> bool {
    value.map(|v| !v.trim().is_empty()).unwrap_or(false)
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("noms")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<NomsConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = NomsConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml).with_context(|| format!("write config: {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg.apply_env());
    }

    let data = fs::read_to_string(&path).with_context(|| format!("read config: {}", path.display()))?;
    let cfg: NomsConfig =
        toml::from_str(&data).with_context(|| format!("parse config: {}", path.display()))?;
    Ok(cfg.apply_env())
}
