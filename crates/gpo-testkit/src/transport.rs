//! Transport wrapper with a configurable delay

use async_trait::async_trait;
use gpo_core::{RawPolicyObject, TransportEffects, TransportError};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Delays every download of the wrapped transport and counts them
pub struct DelayedTransport {
    inner: Arc<dyn TransportEffects>,
    delay: Mutex<Duration>,
    downloads: AtomicUsize,
}

impl DelayedTransport {
    /// Wrap `inner` without delay
    pub fn new(inner: Arc<dyn TransportEffects>) -> Self {
        Self {
            inner,
            delay: Mutex::new(Duration::ZERO),
            downloads: AtomicUsize::new(0),
        }
    }

    /// Delay applied before each following download
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    /// Downloads started so far
    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportEffects for DelayedTransport {
    async fn download(
        &self,
        location: &str,
        ticket: &Path,
    ) -> Result<RawPolicyObject, TransportError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.inner.download(location, ticket).await
    }
}
