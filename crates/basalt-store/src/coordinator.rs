use std::mem;
use std::sync::{Arc, Condvar, Mutex};

use crate::object::LedgerObject;

#[derive(Default)]
struct WriteState {
    /// Objects awaiting a disk write, in arrival order.
    pending: Vec<Arc<LedgerObject>>,
    /// True iff a drain worker is running or scheduled.
    in_flight: bool,
    /// Workers that have been scheduled and have not yet announced their
    /// exit. Lags `in_flight` by the tail of the worker's run, so waiters
    /// can outlast every reference the worker holds.
    active_workers: usize,
    /// Incremented once per completed batch and once per final empty swap;
    /// never decreases.
    generation: u64,
    /// Last recorded write load (see [`WriteCoordinator::write_load`]).
    load: usize,
}

/// Queue of pending writes drained by a single background worker.
///
/// Producers enqueue under the mutex; at most one drain worker exists at a
/// time. The worker repeatedly swaps the pending set out, writes it as one
/// batch, and exits only after observing an empty set while holding the
/// lock, so nothing enqueued during a write is ever stranded.
pub struct WriteCoordinator {
    state: Mutex<WriteState>,
    advanced: Condvar,
}

impl WriteCoordinator {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WriteState::default()),
            advanced: Condvar::new(),
        }
    }

    /// Append an object to the pending set.
    ///
    /// Returns `true` when no drain worker is active: the caller must then
    /// schedule one. Returns `false` when the running worker will pick the
    /// object up on its next pass.
    pub fn enqueue(&self, object: Arc<LedgerObject>) -> bool {
        let mut state = self.state.lock().expect("write lock poisoned");
        state.pending.push(object);
        if state.in_flight {
            false
        } else {
            state.in_flight = true;
            state.active_workers += 1;
            true
        }
    }

    /// One swap step of the drain loop.
    ///
    /// Takes the whole pending set. Returns `None` when the set was empty:
    /// the generation advances, waiters wake, and the worker is unregistered
    /// and must exit. For a non-empty set the generation does NOT advance
    /// yet; the worker writes the batch and then calls
    /// [`WriteCoordinator::complete_drain`], so waiters only observe
    /// progress once the batch is durable. `last_batch` is the size of the
    /// batch the worker wrote on its previous pass (zero on the first).
    pub fn begin_drain(&self, last_batch: usize) -> Option<Vec<Arc<LedgerObject>>> {
        let mut state = self.state.lock().expect("write lock poisoned");
        let batch = mem::take(&mut state.pending);

        if batch.is_empty() {
            state.generation += 1;
            state.in_flight = false;
            state.load = 0;
            self.advanced.notify_all();
            return None;
        }
        state.load = last_batch.max(state.pending.len());
        Some(batch)
    }

    /// Mark the batch taken by the last [`WriteCoordinator::begin_drain`]
    /// as written: advance the generation and wake waiters.
    pub fn complete_drain(&self) {
        let mut state = self.state.lock().expect("write lock poisoned");
        state.generation += 1;
        self.advanced.notify_all();
    }

    /// Announce that a drain worker has exited and dropped every reference
    /// it held. Must be the worker's very last call.
    pub fn worker_exited(&self) {
        let mut state = self.state.lock().expect("write lock poisoned");
        state.active_workers = state.active_workers.saturating_sub(1);
        self.advanced.notify_all();
    }

    /// Block until every scheduled drain worker has run dry and exited, or
    /// return immediately when there is no pending work. On return, every
    /// write enqueued before the call is durable.
    pub fn wait_for_writes(&self) {
        let mut state = self.state.lock().expect("write lock poisoned");
        while state.in_flight || state.active_workers > 0 {
            state = self.advanced.wait(state).expect("write lock poisoned");
        }
    }

    /// Write-load gauge for producer throttling: the larger of the last
    /// drained batch size and the current pending size.
    pub fn write_load(&self) -> usize {
        let state = self.state.lock().expect("write lock poisoned");
        state.load.max(state.pending.len())
    }

    /// Current swap generation.
    pub fn generation(&self) -> u64 {
        self.state.lock().expect("write lock poisoned").generation
    }

    /// Number of objects currently pending.
    pub fn pending_len(&self) -> usize {
        self.state.lock().expect("write lock poisoned").pending.len()
    }
}

impl Default for WriteCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
