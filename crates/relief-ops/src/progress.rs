//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives progress from long-running stages and tells them when to stop.
///
/// Stages poll [`Progress::is_cancelled`] before every unit of work and call
/// [`Progress::advance`] after it.
pub trait Progress {
    /// A new phase with `total` units of work starts.
    fn begin(&mut self, label: &str, total: usize);

    /// `done` units of the current phase are complete.
    fn advance(&mut self, done: usize);

    fn is_cancelled(&self) -> bool;
}

/// Ignores progress and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&mut self, _label: &str, _total: usize) {}

    fn advance(&mut self, _done: usize) {}

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Cancellation flag that can be tripped from another thread, e.g. a dialog's
/// cancel button.
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress sink that only honours a [`CancelToken`].
#[derive(Debug, Clone)]
pub struct TokenProgress {
    token: CancelToken,
}

impl TokenProgress {
    pub fn new(token: CancelToken) -> Self {
        Self { token }
    }
}

impl Progress for TokenProgress {
    fn begin(&mut self, _label: &str, _total: usize) {}

    fn advance(&mut self, _done: usize) {}

    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let progress = TokenProgress::new(token.clone());
        assert!(!progress.is_cancelled());
        token.cancel();
        assert!(progress.is_cancelled());
        assert!(!NoProgress.is_cancelled());
    }
}
