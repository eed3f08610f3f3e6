//! Last-request-wins fencing for async location updates.
//!
//! Every flow that will eventually replace the session's location takes a
//! [`RequestToken`] before awaiting anything. Taking a token invalidates all
//! earlier ones; a flow whose token is no longer current drops its result.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RequestFence {
    generation: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

impl RequestFence {
    /// Start a new request, superseding every outstanding token.
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.generation.load(Ordering::SeqCst) == token.0
    }

    /// Invalidate every outstanding token without starting a request.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_token_wins() {
        let fence = RequestFence::default();
        let first = fence.begin();
        assert!(fence.is_current(first));

        let second = fence.begin();
        assert!(!fence.is_current(first));
        assert!(fence.is_current(second));
        assert!(second.generation() > first.generation());
    }

    #[test]
    fn test_invalidate() {
        let fence = RequestFence::default();
        let token = fence.begin();
        fence.invalidate();
        assert!(!fence.is_current(token));
    }
}
