use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{AppError, Result};

/// Cancellation scope tied to one component instance.
///
/// Calls run through `run` resolve as `AppError::Cancelled` once the scope
/// ends, so a response that arrives after unmount is never applied.
/// Dropping the owner ends the scope.
#[derive(Debug, Default)]
pub struct Lifetime {
    token: CancellationToken,
}

impl Lifetime {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.token.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                debug!("Call abandoned: component unmounted");
                Err(AppError::Cancelled)
            }
            res = fut => res,
        }
    }

    pub fn end(&self) {
        self.token.cancel();
    }

    pub fn is_ended(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Handle that ends this scope from elsewhere, e.g. a navigation task.
    pub fn handle(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Drop for Lifetime {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
