use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use basalt_types::ObjectId;

use crate::backend::Backend;
use crate::error::BackendResult;
use crate::object::LedgerObject;

/// In-memory, HashMap-based backend.
///
/// Intended for tests and embedding. Objects live behind a `RwLock` and are
/// cloned on read. Every fetch and store is counted, so tests can assert
/// that a code path did (or did not) reach the backend.
pub struct MemoryBackend {
    objects: RwLock<HashMap<ObjectId, LedgerObject>>,
    fetches: AtomicU64,
    stores: AtomicU64,
}

impl MemoryBackend {
    /// Create a new empty backend.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            fetches: AtomicU64::new(0),
            stores: AtomicU64::new(0),
        }
    }

    /// Number of objects currently held.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Returns `true` if `id` is stored.
    pub fn contains(&self, id: &ObjectId) -> bool {
        self.objects.read().expect("lock poisoned").contains_key(id)
    }

    /// How many `fetch` calls this backend has served.
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// How many individual object writes this backend has received.
    pub fn store_count(&self) -> u64 {
        self.stores.load(Ordering::Relaxed)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn label(&self) -> &'static str {
        "memory"
    }

    fn fetch(&self, id: &ObjectId) -> BackendResult<Option<LedgerObject>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let objects = self.objects.read().expect("lock poisoned");
        Ok(objects.get(id).cloned())
    }

    fn store(&self, object: &LedgerObject) -> BackendResult<()> {
        self.stores.fetch_add(1, Ordering::Relaxed);
        let mut objects = self.objects.write().expect("lock poisoned");
        objects
            .entry(*object.id())
            .or_insert_with(|| object.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectKind;

    fn make_object(payload: &[u8]) -> LedgerObject {
        let id = ObjectId::compute(payload);
        LedgerObject::new(ObjectKind::Ledger, 5, payload.to_vec(), id)
    }

    #[test]
    fn store_and_fetch() {
        let backend = MemoryBackend::new();
        let object = make_object(b"in memory");
        backend.store(&object).unwrap();

        let fetched = backend.fetch(object.id()).unwrap().expect("stored");
        assert_eq!(fetched, object);
    }

    #[test]
    fn fetch_missing_returns_none() {
        let backend = MemoryBackend::new();
        assert!(backend.fetch(&ObjectId::compute(b"nope")).unwrap().is_none());
    }

    #[test]
    fn rewrites_keep_the_first_copy() {
        let backend = MemoryBackend::new();
        let object = make_object(b"once");
        backend.store(&object).unwrap();
        backend.store(&object).unwrap();
        assert_eq!(backend.len(), 1);
        assert_eq!(backend.store_count(), 2);
    }

    #[test]
    fn counters_track_traffic() {
        let backend = MemoryBackend::new();
        let object = make_object(b"counted");
        backend.store(&object).unwrap();
        backend.fetch(object.id()).unwrap();
        backend.fetch(object.id()).unwrap();
        assert_eq!(backend.store_count(), 1);
        assert_eq!(backend.fetch_count(), 2);
    }

    #[test]
    fn default_batch_stores_every_object() {
        use std::sync::Arc;
        let backend = MemoryBackend::new();
        let batch: Vec<_> = (0..3u32)
            .map(|i| Arc::new(make_object(&i.to_be_bytes())))
            .collect();
        backend.store_batch(&batch).unwrap();
        assert_eq!(backend.len(), 3);
        for object in &batch {
            assert!(backend.contains(object.id()));
        }
    }
}
