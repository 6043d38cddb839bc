//! In-memory caches in front of the durable backends.
//!
//! [`ObjectCache`] holds recently seen objects, bounded by a target entry
//! count and a target age. [`MissCache`] remembers ids recently confirmed
//! absent so repeated misses short-circuit before touching the backend.
//!
//! Both caches are internally synchronized; all methods take `&self`.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::debug;

use basalt_types::ObjectId;

use crate::object::LedgerObject;

struct CacheSlot {
    object: Arc<LedgerObject>,
    last_access: Instant,
}

struct CacheInner {
    entries: HashMap<ObjectId, CacheSlot>,
    /// Soft cap on entry count; 0 disables the size axis.
    target_size: usize,
    /// Soft cap on time since last touch; zero disables the age axis.
    target_age: Duration,
}

impl CacheInner {
    /// Age expiry first, then oldest-access eviction down to the target
    /// size. Not a strict LRU; the targets are soft.
    fn evict(&mut self, now: Instant) {
        let target_age = self.target_age;
        if !target_age.is_zero() {
            self.entries
                .retain(|_, slot| now.duration_since(slot.last_access) <= target_age);
        }

        if self.target_size > 0 && self.entries.len() > self.target_size {
            let mut by_access: Vec<(ObjectId, Instant)> = self
                .entries
                .iter()
                .map(|(id, slot)| (*id, slot.last_access))
                .collect();
            by_access.sort_by_key(|(_, last_access)| *last_access);

            let excess = self.entries.len() - self.target_size;
            for (id, _) in by_access.into_iter().take(excess) {
                self.entries.remove(&id);
            }
        }
    }
}

/// Associative cache of id → shared object, with two-axis eviction.
///
/// Eviction is piggy-backed on inserts and available on demand through
/// [`ObjectCache::sweep`]; an entry can therefore outlive its target age
/// until one of the two runs.
pub struct ObjectCache {
    name: &'static str,
    inner: Mutex<CacheInner>,
}

impl ObjectCache {
    /// Create a cache with the given eviction targets. A zero target
    /// disables that axis.
    pub fn new(name: &'static str, target_size: usize, target_age: Duration) -> Self {
        Self {
            name,
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                target_size,
                target_age,
            }),
        }
    }

    /// If the id is cached, mark it accessed-now and return `true`.
    /// Constructs nothing and clones nothing.
    pub fn touch(&self, id: &ObjectId) -> bool {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        match inner.entries.get_mut(id) {
            Some(slot) => {
                slot.last_access = Instant::now();
                true
            }
            None => false,
        }
    }

    /// If the id is cached, mark it accessed-now and return the shared
    /// instance.
    pub fn fetch(&self, id: &ObjectId) -> Option<Arc<LedgerObject>> {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        inner.entries.get_mut(id).map(|slot| {
            slot.last_access = Instant::now();
            Arc::clone(&slot.object)
        })
    }

    /// Atomically admit `object`, collapsing duplicate constructions.
    ///
    /// Returns `true` if the candidate was inserted (the caller won any
    /// concurrent race for this id). Returns `false` if an instance was
    /// already cached; the caller's `Arc` is redirected to that canonical
    /// instance and the candidate is dropped.
    pub fn canonicalize(&self, object: &mut Arc<LedgerObject>) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock().expect("cache lock poisoned");

        let admitted = match inner.entries.entry(*object.id()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                slot.last_access = now;
                *object = Arc::clone(&slot.object);
                false
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheSlot {
                    object: Arc::clone(object),
                    last_access: now,
                });
                true
            }
        };

        if admitted && inner.target_size > 0 && inner.entries.len() > inner.target_size {
            inner.evict(now);
        }
        admitted
    }

    /// Adjust the entry-count target.
    pub fn set_target_size(&self, target_size: usize) {
        self.inner.lock().expect("cache lock poisoned").target_size = target_size;
    }

    /// Adjust the age target.
    pub fn set_target_age(&self, target_age: Duration) {
        self.inner.lock().expect("cache lock poisoned").target_age = target_age;
    }

    /// Run a full eviction pass now.
    pub fn sweep(&self) {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let before = inner.entries.len();
        inner.evict(Instant::now());
        let evicted = before - inner.entries.len();
        if evicted > 0 {
            debug!(cache = self.name, evicted, retained = inner.entries.len(), "cache sweep");
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded-age set of ids known to be absent from the backend.
///
/// Entries expire after a fixed TTL; expired entries are dropped lazily on
/// lookup and wholesale on insert, so the TTL alone bounds growth.
pub struct MissCache {
    name: &'static str,
    ttl: Duration,
    inner: Mutex<HashMap<ObjectId, Instant>>,
}

impl MissCache {
    /// Create a miss cache whose entries expire after `ttl`.
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    /// Record `id` as known-missing.
    pub fn add(&self, id: ObjectId) {
        let now = Instant::now();
        let mut entries = self.inner.lock().expect("miss cache lock poisoned");
        entries.retain(|_, added| now.duration_since(*added) <= self.ttl);
        entries.insert(id, now);
    }

    /// Forget `id` (it is about to exist).
    pub fn remove(&self, id: &ObjectId) {
        self.inner
            .lock()
            .expect("miss cache lock poisoned")
            .remove(id);
    }

    /// Returns `true` if `id` was recorded missing within the TTL.
    pub fn contains(&self, id: &ObjectId) -> bool {
        let mut entries = self.inner.lock().expect("miss cache lock poisoned");
        match entries.get(id) {
            Some(added) if added.elapsed() <= self.ttl => true,
            Some(_) => {
                entries.remove(id);
                false
            }
            None => false,
        }
    }

    /// Drop every expired entry now.
    pub fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.inner.lock().expect("miss cache lock poisoned");
        let before = entries.len();
        entries.retain(|_, added| now.duration_since(*added) <= self.ttl);
        let expired = before - entries.len();
        if expired > 0 {
            debug!(cache = self.name, expired, "miss cache sweep");
        }
    }

    /// Number of recorded misses (including not-yet-collected expired ones).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("miss cache lock poisoned").len()
    }

    /// Returns `true` if no misses are recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
