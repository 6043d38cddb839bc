//! Content-addressed object storage for Basalt ledger nodes.
//!
//! This crate is the hot read/write path for ledger state traversal. Four
//! object types -- ledger headers, transactions, account-state tree nodes,
//! transaction-tree nodes -- share one hashed-object interface: immutable
//! blobs keyed by the BLAKE3 digest of their payload.
//!
//! # Components
//!
//! - [`ObjectStore`] -- the facade: `store`, `fetch`, `wait_for_writes`
//! - [`ObjectCache`] / [`MissCache`] -- positive and negative caches
//! - [`WriteCoordinator`] -- pending writes drained in batches by a single
//!   background worker
//! - [`Backend`] -- pluggable durable layer, with [`KvBackend`] (redb),
//!   [`SqliteBackend`] and the test-oriented [`MemoryBackend`]
//! - [`TaskExecutor`] -- seam to the embedding process's job scheduler
//!
//! # Design Rules
//!
//! 1. Objects are immutable and the store is append-only; eviction touches
//!    only the caches.
//! 2. One live instance per id: concurrent constructions of the same object
//!    collapse onto the first-admitted instance (`canonicalize`).
//! 3. `store` never blocks on I/O; disk writes are coalesced into batches.
//! 4. The backend is authoritative: its structural failures halt the
//!    process rather than risk silent data loss.

pub mod backend;
pub mod cache;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
mod import;
pub mod kv;
pub mod memory;
pub mod object;
pub mod sql;
pub mod store;

// Re-export primary types at crate root for ergonomic imports.
pub use backend::Backend;
pub use cache::{MissCache, ObjectCache};
pub use config::{BackendKind, StoreConfig};
pub use coordinator::WriteCoordinator;
pub use error::{BackendError, BackendResult, StoreError, StoreResult};
pub use executor::{TaskExecutor, TaskKind, ThreadExecutor};
pub use kv::KvBackend;
pub use memory::MemoryBackend;
pub use object::{LedgerObject, ObjectKind};
pub use sql::SqliteBackend;
pub use store::ObjectStore;
