//! Per-request context

use std::future::Future;
use std::time::Duration;
use tokio::time::{error::Elapsed, Instant};

/// Caller supplied bounds of one request.
///
/// Cancelling a request is dropping its future; in-flight downloads and
/// directory commands are aborted with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Instant after which network operations give up
    pub deadline: Option<Instant>,
}

impl RequestContext {
    /// Context without a deadline
    pub fn new() -> Self {
        Self::default()
    }

    /// Context expiring `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Run `fut` bounded by the deadline, if any
    pub async fn bounded<F: Future>(&self, fut: F) -> Result<F::Output, Elapsed> {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut).await,
            None => Ok(fut.await),
        }
    }
}
