//! Script executor boundary.
//!
//! Documents may carry scripts; noms does not ship an interpreter. A frontend
//! that embeds one implements [`ScriptExecutor`] and passes it to
//! [`Application::render`](crate::content::Application::render).

use crate::content::Document;

pub trait ScriptExecutor {
    /// Evaluate one script in the context of `document`.
    ///
    /// Errors are reported by the caller and never abort rendering.
    fn eval(&mut self, source: &str, document: &Document) -> anyhow::Result<()>;
}

/// Executor that evaluates nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullExecutor;

impl ScriptExecutor for NullExecutor {
    fn eval(&mut self, source: &str, document: &Document) -> anyhow::Result<()> {
        tracing::debug!(
            doctype = %document.doctype,
            bytes = source.len(),
            "no script executor configured; skipping script"
        );
        Ok(())
    }
}
