//! Request context
//!
//! Carries cancellation and an optional deadline from the original caller
//! down to every repository call. snapfs itself never times out or retries;
//! repositories race their I/O against the context with [`Context::run`].

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{SnapError, SnapResult};

#[derive(Debug, Clone, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derived context, cancelled with its parent or on its own
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast if the caller already gave up
    pub fn check(&self) -> SnapResult<()> {
        if self.cancel.is_cancelled() {
            return Err(SnapError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(SnapError::Timeout);
            }
        }
        Ok(())
    }

    /// Drive `fut` unless the context is cancelled or expires first
    pub async fn run<F, T>(&self, fut: F) -> SnapResult<T>
    where
        F: Future<Output = SnapResult<T>>,
    {
        self.check()?;

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => Err(SnapError::Cancelled),
                    _ = tokio::time::sleep_until(deadline) => Err(SnapError::Timeout),
                    res = fut => res,
                }
            }
            None => {
                tokio::select! {
                    _ = self.cancel.cancelled() => Err(SnapError::Cancelled),
                    res = fut => res,
                }
            }
        }
    }
}
