//! Redirect policy: ordered predicates every redirect target must satisfy.

use std::fmt;
use url::Url;

/// Approves or rejects one candidate redirect target.
pub type RedirectCheck = Box<dyn Fn(&Url) -> bool + Send>;

/// Ordered set of redirect checks. Empty means every target is allowed.
#[derive(Default)]
pub struct RedirectChecks {
    checks: Vec<RedirectCheck>,
}

impl RedirectChecks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, check: RedirectCheck) {
        self.checks.push(check);
    }

    pub fn clear(&mut self) {
        self.checks.clear();
    }

    /// Remove and return the most recently added check.
    pub fn pop(&mut self) -> Option<RedirectCheck> {
        self.checks.pop()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every check in registration order; all must approve.
    pub fn approve(&self, candidate: &Url) -> bool {
        if !self.checks.is_empty() {
            tracing::debug!(
                "running {} redirect checks on {}",
                self.checks.len(),
                candidate
            );
        }
        self.checks.iter().all(|check| check(candidate))
    }
}

impl fmt::Debug for RedirectChecks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedirectChecks")
            .field("len", &self.checks.len())
            .finish()
    }
}

/// Check that only allows targets on the same scheme, host and port as `base`.
pub fn same_origin(base: &Url) -> RedirectCheck {
    let origin = base.origin();
    Box::new(move |candidate: &Url| candidate.origin() == origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn empty_policy_allows_everything() {
        let checks = RedirectChecks::new();
        assert!(checks.is_empty());
        assert!(checks.approve(&url("https://anywhere.example/")));
    }

    #[test]
    fn all_checks_must_approve() {
        let mut checks = RedirectChecks::new();
        checks.push(Box::new(|u: &Url| u.scheme() == "https"));
        checks.push(Box::new(|u: &Url| u.host_str() == Some("good.example")));
        assert!(checks.approve(&url("https://good.example/x")));
        assert!(!checks.approve(&url("http://good.example/x")));
        assert!(!checks.approve(&url("https://evil.example/x")));
    }

    #[test]
    fn evaluation_stops_at_first_rejection() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let mut checks = RedirectChecks::new();
        checks.push(Box::new(|_: &Url| false));
        checks.push(Box::new(move |_: &Url| {
            seen.fetch_add(1, Ordering::SeqCst);
            true
        }));
        assert!(!checks.approve(&url("http://x.example/")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pop_removes_most_recent_and_clear_empties() {
        let mut checks = RedirectChecks::new();
        checks.push(Box::new(|_: &Url| true));
        checks.push(Box::new(|_: &Url| false));
        assert_eq!(checks.len(), 2);
        let popped = checks.pop().unwrap();
        assert!(!popped(&url("http://x.example/")));
        assert!(checks.approve(&url("http://x.example/")));
        checks.clear();
        assert!(checks.pop().is_none());
    }

    #[test]
    fn same_origin_check() {
        let check = same_origin(&url("http://127.0.0.1:4567/doc.json"));
        assert!(check(&url("http://127.0.0.1:4567/other")));
        assert!(!check(&url("http://127.0.0.1:4568/other")));
        assert!(!check(&url("https://127.0.0.1:4567/other")));
    }
}
