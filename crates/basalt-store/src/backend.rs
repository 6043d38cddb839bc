use std::sync::Arc;

use basalt_types::ObjectId;

use crate::error::BackendResult;
use crate::object::LedgerObject;

/// Durable key-value layer beneath the object store.
///
/// All implementations must satisfy these invariants:
/// - The store is append-only: objects are immutable and never deleted.
///   Re-writes of an existing id are silently skipped.
/// - `fetch` of an absent id is not an error; it returns `Ok(None)`.
/// - A batch accepted by `store_batch` is committed atomically.
/// - Implementations provide their own internal synchronization; every
///   method takes `&self` and may be called from any thread.
pub trait Backend: Send + Sync {
    /// Short backend label for log lines.
    fn label(&self) -> &'static str;

    /// Read one object by id.
    fn fetch(&self, id: &ObjectId) -> BackendResult<Option<LedgerObject>>;

    /// Write one object.
    fn store(&self, object: &LedgerObject) -> BackendResult<()>;

    /// Write a batch of objects atomically.
    ///
    /// The default forwards to [`Backend::store`] per object; engines with
    /// native batch transactions override it.
    fn store_batch(&self, batch: &[Arc<LedgerObject>]) -> BackendResult<()> {
        for object in batch {
            self.store(object)?;
        }
        Ok(())
    }
}
