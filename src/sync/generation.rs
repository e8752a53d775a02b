use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one issued request. Only the most recently issued token of a
/// `Generation` is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Monotonic request counter for one subject.
///
/// Every new request (and every subject change) bumps the counter; a response
/// may be applied only while its token is still current.
#[derive(Debug, Default)]
pub struct Generation {
    current: AtomicU64,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> RequestToken {
        RequestToken(self.current.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Invalidate everything in flight without issuing a new request.
    pub fn bump(&self) {
        self.current.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::Acquire) == token.0
    }
}
