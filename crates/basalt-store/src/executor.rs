use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tracing::trace;

/// Work categories the store reports to its scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    /// Background batch write of pending objects.
    Write,
    /// Object fetch served by the ephemeral tier.
    ObjectRead,
    /// Object fetch that reached the primary backend.
    DiskRead,
}

/// External job-scheduling seam.
///
/// The store never spawns work directly: drains go through [`submit`] and
/// backend reads are announced through [`load_event`], so the embedding
/// process can route them into its own scheduler and load tracking. The
/// default [`ThreadExecutor`] is sufficient for tools and tests.
///
/// [`submit`]: TaskExecutor::submit
/// [`load_event`]: TaskExecutor::load_event
pub trait TaskExecutor: Send + Sync {
    /// Run `task` asynchronously.
    fn submit(&self, kind: TaskKind, name: &'static str, task: Box<dyn FnOnce() + Send + 'static>);

    /// Record that an operation of the given kind is about to hit storage.
    fn load_event(&self, _kind: TaskKind, _name: &'static str) {}
}

/// Default executor: one detached OS thread per submitted task, with
/// counters for tests and diagnostics.
pub struct ThreadExecutor {
    submitted: AtomicU64,
    object_reads: AtomicU64,
    disk_reads: AtomicU64,
}

impl ThreadExecutor {
    pub fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            object_reads: AtomicU64::new(0),
            disk_reads: AtomicU64::new(0),
        }
    }

    /// Number of tasks submitted so far.
    pub fn submitted_count(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Number of ephemeral-tier read events recorded.
    pub fn object_read_count(&self) -> u64 {
        self.object_reads.load(Ordering::Relaxed)
    }

    /// Number of primary-backend read events recorded.
    pub fn disk_read_count(&self) -> u64 {
        self.disk_reads.load(Ordering::Relaxed)
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskExecutor for ThreadExecutor {
    fn submit(&self, kind: TaskKind, name: &'static str, task: Box<dyn FnOnce() + Send + 'static>) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        trace!(?kind, name, "spawning task");
        thread::Builder::new()
            .name(name.to_string())
            .spawn(task)
            .expect("failed to spawn store worker thread");
    }

    fn load_event(&self, kind: TaskKind, name: &'static str) {
        match kind {
            TaskKind::ObjectRead => self.object_reads.fetch_add(1, Ordering::Relaxed),
            TaskKind::DiskRead => self.disk_reads.fetch_add(1, Ordering::Relaxed),
            TaskKind::Write => 0,
        };
        trace!(?kind, name, "load event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn submitted_tasks_run() {
        let executor = ThreadExecutor::new();
        let (tx, rx) = mpsc::channel();
        executor.submit(
            TaskKind::Write,
            "test task",
            Box::new(move || tx.send(42u32).expect("receiver alive")),
        );

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
        assert_eq!(executor.submitted_count(), 1);
    }

    #[test]
    fn load_events_are_counted_by_kind() {
        let executor = ThreadExecutor::new();
        executor.load_event(TaskKind::ObjectRead, "fetch");
        executor.load_event(TaskKind::DiskRead, "fetch");
        executor.load_event(TaskKind::DiskRead, "fetch");
        assert_eq!(executor.object_read_count(), 1);
        assert_eq!(executor.disk_read_count(), 2);
    }
}
