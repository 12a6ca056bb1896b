//! Durable key/value persistence used by the event logs.

use crate::error::Result;

/// Synchronous key/value store.
///
/// `save` must not return until the value is durably recorded under `key`.
/// Every save is atomic on its own; nothing is transactional across keys.
/// Errors are returned to the caller, never swallowed.
pub trait DurableStore: Send + Sync {
    /// Backend name, for logs.
    fn name(&self) -> &str;

    /// Most recent value saved under `key`, or `None` if nothing was saved.
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value under `key`.
    fn save(&self, key: &str, value: &str) -> Result<()>;
}
