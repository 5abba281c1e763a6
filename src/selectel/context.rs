//! Request deadlines
//!
//! A [`RequestContext`] travels with every network-bound call of one
//! resource operation (authentication, list calls and quota updates) so an
//! unresponsive service cannot block an apply indefinitely.

use crate::error::{ProviderError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Deadline shared by all calls of one operation
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    budget: Option<Duration>,
}

impl RequestContext {
    /// Context without a deadline
    pub fn background() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            budget: Some(timeout),
        }
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    /// Run `fut`, failing with [`ProviderError::DeadlineExceeded`] once the deadline passes.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let Some(deadline) = self.deadline else {
            return fut.await;
        };

        match tokio::time::timeout_at(deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                let budget = self.budget.unwrap_or_default();
                tracing::warn!("Operation exceeded its deadline of {:?}", budget);
                Err(ProviderError::DeadlineExceeded(budget))
            }
        }
    }
}
