use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use basalt_types::ObjectId;

use crate::backend::Backend;
use crate::error::{BackendError, BackendResult};
use crate::object::{LedgerObject, ObjectKind};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS objects (
    hash       BLOB PRIMARY KEY,
    obj_type   CHAR(1) NOT NULL,
    ledger_seq INTEGER NOT NULL,
    payload    BLOB NOT NULL
);";

/// SQL table backend over rusqlite.
///
/// One row per object; the kind is stored as its single-character code. A
/// batch is written inside one transaction with `INSERT OR IGNORE`, so
/// re-inserts of an existing id are silently skipped and the batch commits
/// atomically. The connection is serialized behind a mutex.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database file at `path`.
    ///
    /// `standalone` relaxes durability for throwaway processes: the journal
    /// is kept in memory and syncs are skipped. Service processes get WAL
    /// with normal syncs.
    pub fn open(path: &Path, standalone: bool) -> BackendResult<Self> {
        let conn = Connection::open(path)?;
        if standalone {
            conn.pragma_update(None, "journal_mode", "MEMORY")?;
            conn.pragma_update(None, "synchronous", "OFF")?;
        } else {
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
        }
        conn.execute_batch(SCHEMA)?;

        debug!(path = %path.display(), standalone, "opened sql backend");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl Backend for SqliteBackend {
    fn label(&self) -> &'static str {
        "sql"
    }

    fn fetch(&self, id: &ObjectId) -> BackendResult<Option<LedgerObject>> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        let row = conn
            .query_row(
                "SELECT obj_type, ledger_seq, payload FROM objects WHERE hash = ?1",
                params![id.as_bytes().as_slice()],
                |row| {
                    let code: String = row.get(0)?;
                    let ledger_seq: u32 = row.get(1)?;
                    let payload: Vec<u8> = row.get(2)?;
                    Ok((code, ledger_seq, payload))
                },
            )
            .optional()?;

        let Some((code, ledger_seq, payload)) = row else {
            return Ok(None);
        };
        let kind = ObjectKind::from_code(&code).ok_or_else(|| BackendError::Corrupt {
            id: *id,
            reason: format!("unrecognized object type code '{code}'"),
        })?;
        Ok(Some(LedgerObject::new(kind, ledger_seq, payload, *id)))
    }

    fn store(&self, object: &LedgerObject) -> BackendResult<()> {
        let conn = self.conn.lock().expect("connection lock poisoned");
        conn.execute(
            "INSERT OR IGNORE INTO objects (hash, obj_type, ledger_seq, payload) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                object.id().as_bytes().as_slice(),
                object.kind().code(),
                object.ledger_seq(),
                object.data(),
            ],
        )?;
        Ok(())
    }

    fn store_batch(&self, batch: &[Arc<LedgerObject>]) -> BackendResult<()> {
        let mut conn = self.conn.lock().expect("connection lock poisoned");
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO objects (hash, obj_type, ledger_seq, payload) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for object in batch {
                stmt.execute(params![
                    object.id().as_bytes().as_slice(),
                    object.kind().code(),
                    object.ledger_seq(),
                    object.data(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_object(kind: ObjectKind, ledger_seq: u32, payload: &[u8]) -> LedgerObject {
        LedgerObject::new(kind, ledger_seq, payload.to_vec(), ObjectId::compute(payload))
    }

    #[test]
    fn store_and_fetch_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(&dir.path().join("objects.db"), true).unwrap();

        let object = make_object(ObjectKind::Transaction, 11, b"signed tx");
        backend.store(&object).unwrap();

        let fetched = backend.fetch(object.id()).unwrap().expect("stored");
        assert_eq!(fetched, object);
    }

    #[test]
    fn fetch_missing_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(&dir.path().join("objects.db"), true).unwrap();
        assert!(backend
            .fetch(&ObjectId::compute(b"absent"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn kind_is_stored_as_its_code() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.db");
        let backend = SqliteBackend::open(&path, true).unwrap();

        let object = make_object(ObjectKind::AccountNode, 3, b"state node");
        backend.store(&object).unwrap();
        drop(backend);

        // Inspect the table directly: the row must carry the 'A' code.
        let conn = Connection::open(&path).unwrap();
        let code: String = conn
            .query_row(
                "SELECT obj_type FROM objects WHERE hash = ?1",
                params![object.id().as_bytes().as_slice()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(code, "A");
    }

    #[test]
    fn reinsert_keeps_the_first_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.db");
        let backend = SqliteBackend::open(&path, true).unwrap();

        let payload = b"first writer wins".to_vec();
        let id = ObjectId::compute(&payload);
        backend
            .store(&LedgerObject::new(ObjectKind::Ledger, 1, payload.clone(), id))
            .unwrap();
        // Same id, different metadata; INSERT OR IGNORE must skip it.
        backend
            .store(&LedgerObject::new(ObjectKind::Unknown, 99, payload, id))
            .unwrap();

        let fetched = backend.fetch(&id).unwrap().expect("stored");
        assert_eq!(fetched.kind(), ObjectKind::Ledger);
        assert_eq!(fetched.ledger_seq(), 1);
    }

    #[test]
    fn batch_commits_every_object() {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(&dir.path().join("objects.db"), true).unwrap();

        let batch: Vec<_> = (0..64u32)
            .map(|i| Arc::new(make_object(ObjectKind::TransactionNode, i, &i.to_be_bytes())))
            .collect();
        backend.store_batch(&batch).unwrap();

        for object in &batch {
            let fetched = backend.fetch(object.id()).unwrap().expect("in batch");
            assert_eq!(&fetched, object.as_ref());
        }
    }

    #[test]
    fn unknown_type_code_reads_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.db");
        let backend = SqliteBackend::open(&path, true).unwrap();

        let id = ObjectId::compute(b"mystery row");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute(
                "INSERT INTO objects (hash, obj_type, ledger_seq, payload) \
                 VALUES (?1, 'Z', 5, x'00')",
                params![id.as_bytes().as_slice()],
            )
            .unwrap();
        }

        let err = backend.fetch(&id).unwrap_err();
        assert!(err.is_corrupt());
    }

    #[test]
    fn objects_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("objects.db");
        let object = make_object(ObjectKind::Ledger, 2, b"durable row");

        {
            let backend = SqliteBackend::open(&path, false).unwrap();
            backend.store(&object).unwrap();
        }

        let backend = SqliteBackend::open(&path, false).unwrap();
        let fetched = backend.fetch(object.id()).unwrap().expect("persisted");
        assert_eq!(fetched, object);
    }
}
