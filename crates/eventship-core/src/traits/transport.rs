//! Network transport for serialized batches.

use async_trait::async_trait;

use crate::error::Result;

/// Delivers one serialized batch to the collector.
///
/// `Ok(())` means the collector acknowledged the batch. Any error (transport
/// failure, timeout, non-success status) counts as a failed attempt and the
/// batch is retried by the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name, for logs.
    fn name(&self) -> &str;

    /// Send one batch payload.
    async fn send(&self, payload: &str) -> Result<()>;
}
