//! Cancellation and deadline scope for a single call.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ClientError, Result};

/// Cancellation signal and optional deadline bounding one `run` call.
///
/// Contexts are cheap to clone; clones share the same cancellation token.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use horizon_lattice_graphql::Context;
///
/// let ctx = Context::background().with_timeout(Duration::from_secs(1));
/// let guard = ctx.clone();
///
/// // Elsewhere: abort the call.
/// guard.cancel();
/// ```
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context driven by an existing cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derive a context that also expires after `timeout`.
    ///
    /// The earlier of the existing and the new deadline applies. A timeout too
    /// large to represent as an instant adds no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Derive a context that also expires at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The error this context reports if it is already done.
    pub fn err(&self) -> Option<ClientError> {
        if self.token.is_cancelled() {
            Some(ClientError::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(ClientError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Drive `fut` to completion unless the context finishes first.
    pub async fn run_until_done<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ClientError::Cancelled),
            _ = deadline => Err(ClientError::DeadlineExceeded),
            result = fut => result,
        }
    }
}
