//! CLI for the noms document user agent.

mod display;
mod prompt;

use anyhow::{Context, Result};
use clap::Parser;
use noms_core::auth::{CredentialProvider, FileCredentialStore, StaticCredentials};
use noms_core::config::NomsConfig;
use noms_core::content::Application;
use noms_core::origin::Origin;
use noms_core::script::NullExecutor;
use std::io::{IsTerminal, Write};

use display::{render_output, Output};

/// Top-level CLI: fetch an origin and display what it resolves to.
#[derive(Debug, Parser)]
#[command(name = "noms")]
#[command(about = "noms: command-line user agent for JSON documents", long_about = None)]
pub struct Cli {
    /// Trace every request and response (same as NOMS_DEBUG=1).
    #[arg(long)]
    pub debug: bool,

    /// Never ask for credentials on a 401; use stored identities only.
    #[arg(long)]
    pub no_prompt: bool,

    /// Username for HTTP authentication challenges.
    #[arg(long, requires = "password", value_name = "USER")]
    pub user: Option<String>,

    /// Password for HTTP authentication challenges.
    #[arg(long, requires = "user", value_name = "PASSWORD")]
    pub password: Option<String>,

    /// URL, local file path, or data: reference to fetch.
    pub origin: String,

    /// Arguments handed to the document.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Argument vector as seen by the document: origin first.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.origin.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    fn credentials(&self) -> Result<Box<dyn CredentialProvider + Send>> {
        if let (Some(user), Some(password)) = (&self.user, &self.password) {
            return Ok(Box::new(StaticCredentials::new(user, password)));
        }
        let path = FileCredentialStore::default_path()
            .context("locate identity store under XDG state dir")?;
        let store = FileCredentialStore::new(path);
        if self.no_prompt || !std::io::stdin().is_terminal() {
            return Ok(Box::new(store));
        }
        Ok(Box::new(store.with_prompt(Box::new(prompt::ask))))
    }

    /// Fetch, render and display the origin. Returns the process exit code.
    pub fn run(&self, cfg: &NomsConfig) -> Result<i32> {
        let origin = Origin::parse(&self.origin)?;
        let mut app = Application::new(origin, self.argv(), cfg, self.credentials()?);

        app.fetch()?;
        app.render(&mut NullExecutor);

        let body = app.body().context("fetch produced no body")?;
        let content_type = app.content_type().unwrap_or_default();
        let is_tty = std::io::stdout().is_terminal();
        match render_output(content_type, body, is_tty)? {
            Output::Text(text) => {
                let mut out = std::io::stdout().lock();
                out.write_all(text.as_bytes())?;
                if !text.ends_with('\n') {
                    out.write_all(b"\n")?;
                }
            }
            Output::Bytes(bytes) => std::io::stdout().lock().write_all(&bytes)?,
            Output::Withheld => {
                tracing::warn!("unknown data of type '{}' not sent to terminal", content_type);
            }
        }

        Ok(app.exit_code())
    }
}

#[cfg(test)]
mod tests;
