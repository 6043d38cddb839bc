use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, trace, warn};

use basalt_types::ObjectId;

use crate::backend::Backend;
use crate::cache::{MissCache, ObjectCache};
use crate::config::{BackendKind, StoreConfig};
use crate::coordinator::WriteCoordinator;
use crate::error::{BackendError, StoreError, StoreResult};
use crate::executor::{TaskExecutor, TaskKind, ThreadExecutor};
use crate::import;
use crate::kv::KvBackend;
use crate::object::{LedgerObject, ObjectKind};
use crate::sql::SqliteBackend;

/// How long a confirmed miss suppresses further backend reads.
const MISS_TTL: Duration = Duration::from_secs(120);

struct StoreInner {
    cache: ObjectCache,
    misses: MissCache,
    primary: Option<Box<dyn Backend>>,
    ephemeral: Option<Box<dyn Backend>>,
    coordinator: Arc<WriteCoordinator>,
    executor: Arc<dyn TaskExecutor>,
}

/// The hot-path object store: positive and negative caches, a pluggable
/// durable backend with an optional ephemeral mirror, and a write-coalescing
/// pipeline drained by a single background worker.
///
/// All methods are safe to call concurrently. `store` never blocks on I/O;
/// disk writes are batched behind the scenes and can be awaited with
/// [`ObjectStore::wait_for_writes`].
///
/// Backend failures are structural: the backend is authoritative, and silent
/// data loss is worse than crashing, so `store`/`fetch` escalate I/O errors
/// by panicking instead of returning them.
pub struct ObjectStore {
    inner: Arc<StoreInner>,
}

impl ObjectStore {
    /// Open a store as described by `config`.
    ///
    /// Fails on an unrecognized backend name or a backend that cannot be
    /// opened; callers are expected to abort at startup on `Err`.
    pub fn open(config: &StoreConfig) -> StoreResult<Self> {
        let kind = BackendKind::from_name(&config.backend)
            .ok_or_else(|| StoreError::UnknownBackend(config.backend.clone()))?;
        let primary: Box<dyn Backend> = match kind {
            BackendKind::Kv => Box::new(KvBackend::open(&config.path)?),
            BackendKind::Sql => Box::new(SqliteBackend::open(&config.path, config.standalone)?),
        };
        let ephemeral: Option<Box<dyn Backend>> = match &config.ephemeral_path {
            Some(path) => Some(Box::new(KvBackend::open(path)?)),
            None => None,
        };

        Ok(Self::assemble(
            Some(primary),
            ephemeral,
            Arc::new(ThreadExecutor::new()),
            config.cache_target_size,
            Duration::from_secs(config.cache_target_age_secs),
        ))
    }

    /// Assemble a store from already-built parts.
    ///
    /// This is the embedding/test entry point: any [`Backend`] and
    /// [`TaskExecutor`] implementation can be injected. A store without a
    /// primary backend is disabled: `store` is a no-op success and `fetch`
    /// always misses.
    pub fn with_backends(
        primary: Option<Box<dyn Backend>>,
        ephemeral: Option<Box<dyn Backend>>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        let defaults = StoreConfig::default();
        Self::assemble(
            primary,
            ephemeral,
            executor,
            defaults.cache_target_size,
            Duration::from_secs(defaults.cache_target_age_secs),
        )
    }

    fn assemble(
        primary: Option<Box<dyn Backend>>,
        ephemeral: Option<Box<dyn Backend>>,
        executor: Arc<dyn TaskExecutor>,
        cache_target_size: usize,
        cache_target_age: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                cache: ObjectCache::new("objects", cache_target_size, cache_target_age),
                misses: MissCache::new("object-misses", MISS_TTL),
                primary,
                ephemeral,
                coordinator: Arc::new(WriteCoordinator::new()),
                executor,
            }),
        }
    }

    /// Admit an object.
    ///
    /// Returns `false` iff the id was already in the positive cache (a fast
    /// duplicate). Returns `true` otherwise: the object was admitted and, if
    /// this call won any concurrent duplicate-construction race, queued for
    /// a batched disk write. By contract `id` is the content digest of
    /// `data`; this is checked only in debug builds.
    pub fn store(&self, kind: ObjectKind, ledger_seq: u32, data: Vec<u8>, id: ObjectId) -> bool {
        let inner = &self.inner;
        if inner.primary.is_none() {
            return true;
        }
        if inner.cache.touch(&id) {
            trace!(id = %id.short_hex(), "store: already cached");
            return false;
        }

        debug_assert_eq!(
            ObjectId::compute(&data),
            id,
            "object payload does not match its digest"
        );

        let mut object = Arc::new(LedgerObject::new(kind, ledger_seq, data, id));
        if inner.cache.canonicalize(&mut object) {
            // We won the admit race, so queueing the write is on us.
            if inner.coordinator.enqueue(object) {
                let worker = Arc::clone(inner);
                let coordinator = Arc::clone(&inner.coordinator);
                inner.executor.submit(
                    TaskKind::Write,
                    "object-store-drain",
                    Box::new(move || {
                        worker.drain();
                        // Release the store before announcing the exit, so a
                        // flusher that tears the store down afterwards never
                        // races this worker for the backend.
                        drop(worker);
                        coordinator.worker_exited();
                    }),
                );
            }
        }
        inner.misses.remove(&id);
        true
    }

    /// Look up an object by id.
    ///
    /// Consults, in order: the positive cache, the negative cache, the
    /// ephemeral mirror, the primary backend. Returns `None` iff the object
    /// is nowhere to be found (or the store is disabled).
    pub fn fetch(&self, id: &ObjectId) -> Option<Arc<LedgerObject>> {
        self.inner.fetch(id)
    }

    /// Block until every write enqueued before this call is durable.
    /// Returns immediately when there is no pending work.
    pub fn wait_for_writes(&self) {
        self.inner.coordinator.wait_for_writes();
    }

    /// Adjust the positive cache's eviction targets.
    pub fn tune(&self, target_size: usize, target_age: Duration) {
        self.inner.cache.set_target_size(target_size);
        self.inner.cache.set_target_age(target_age);
    }

    /// Write-load gauge for producer throttling: the larger of the last
    /// drained batch size and the current pending-queue depth.
    pub fn write_load(&self) -> usize {
        self.inner.coordinator.write_load()
    }

    /// Run an eviction pass over both caches now.
    pub fn sweep(&self) {
        self.inner.cache.sweep();
        self.inner.misses.sweep();
    }

    /// Number of objects in the positive cache.
    pub fn cache_len(&self) -> usize {
        self.inner.cache.len()
    }

    /// One-shot migration from a legacy SQL object table into the primary
    /// backend. Bypasses the caches and the write coordinator. Returns the
    /// number of objects written.
    pub fn import_legacy(&self, path: &Path) -> StoreResult<u64> {
        let primary = self.inner.primary.as_deref().ok_or(StoreError::Disabled)?;
        import::run(path, primary)
    }
}

impl std::fmt::Debug for ObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStore")
            .field("cached", &self.inner.cache.len())
            .field("pending", &self.inner.coordinator.pending_len())
            .field(
                "primary",
                &self.inner.primary.as_ref().map(|backend| backend.label()),
            )
            .field("ephemeral", &self.inner.ephemeral.is_some())
            .finish()
    }
}

impl StoreInner {
    fn fetch(&self, id: &ObjectId) -> Option<Arc<LedgerObject>> {
        if let Some(object) = self.cache.fetch(id) {
            trace!(id = %id.short_hex(), "fetch: cached");
            return Some(object);
        }
        if self.misses.contains(id) {
            trace!(id = %id.short_hex(), "fetch: known missing");
            return None;
        }

        if let Some(ephemeral) = &self.ephemeral {
            self.executor.load_event(TaskKind::ObjectRead, "fetch");
            match ephemeral.fetch(id) {
                Ok(Some(object)) => {
                    let mut object = Arc::new(object);
                    self.cache.canonicalize(&mut object);
                    trace!(id = %id.short_hex(), "fetch: in ephemeral");
                    return Some(object);
                }
                Ok(None) => {}
                Err(err) if err.is_corrupt() => {
                    warn!(id = %id.short_hex(), error = %err, "undecodable ephemeral object");
                }
                Err(err) => self.fatal("ephemeral read failed", err),
            }
        }

        let primary = self.primary.as_ref()?;
        self.executor.load_event(TaskKind::DiskRead, "fetch");
        match primary.fetch(id) {
            Ok(Some(object)) => {
                let mut object = Arc::new(object);
                self.cache.canonicalize(&mut object);
                self.misses.remove(id);
                if let Some(ephemeral) = &self.ephemeral {
                    if let Err(err) = ephemeral.store(&object) {
                        self.fatal("ephemeral mirror write failed", err);
                    }
                }
                trace!(id = %id.short_hex(), "fetch: in primary");
                Some(object)
            }
            Ok(None) => {
                self.misses.add(*id);
                trace!(id = %id.short_hex(), "fetch: not in primary");
                None
            }
            Err(err) if err.is_corrupt() => {
                error!(id = %id.short_hex(), error = %err, "treating undecodable object as missing");
                self.misses.add(*id);
                None
            }
            Err(err) => self.fatal("primary read failed", err),
        }
    }

    /// Drain loop run by the single background worker. Exits only after
    /// observing an empty pending set under the coordinator lock.
    fn drain(&self) {
        let Some(primary) = self.primary.as_ref() else {
            return;
        };
        let mut last_batch = 0usize;
        while let Some(batch) = self.coordinator.begin_drain(last_batch) {
            last_batch = batch.len();
            if let Err(err) = primary.store_batch(&batch) {
                self.fatal("batch write failed", err);
            }
            if let Some(ephemeral) = &self.ephemeral {
                if let Err(err) = ephemeral.store_batch(&batch) {
                    self.fatal("ephemeral batch write failed", err);
                }
            }
            self.coordinator.complete_drain();
            debug!(batch = last_batch, backend = primary.label(), "drained pending writes");
        }
    }

    fn fatal(&self, context: &'static str, err: BackendError) -> ! {
        error!(error = %err, "{context}; the store cannot continue");
        panic!("{context}: {err}");
    }
}
