use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use tracing::{info, warn};

use basalt_types::ObjectId;

use crate::backend::Backend;
use crate::error::{BackendError, StoreResult};
use crate::object::{LedgerObject, ObjectKind};

const PROGRESS_INTERVAL: u64 = 10_000;

/// One-shot migration from a legacy `CommittedObjects` SQLite table.
///
/// Iterates the legacy rows and writes each object to `backend` with a
/// single-record put, bypassing caches and the write coordinator. The
/// legacy table stores the hash as a 64-character hex string. Rows with a
/// null or malformed hash are skipped with a warning; an unrecognized type
/// code is imported as [`ObjectKind::Unknown`]. Returns the number of
/// objects written; any backend or source error aborts the migration.
pub(crate) fn run(path: &Path, backend: &dyn Backend) -> StoreResult<u64> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(BackendError::from)?;
    let mut stmt = conn
        .prepare("SELECT Hash, ObjType, LedgerIndex, Object FROM CommittedObjects")
        .map_err(BackendError::from)?;
    let mut rows = stmt.query([]).map_err(BackendError::from)?;

    let mut written = 0u64;
    let mut scanned = 0u64;
    while let Some(row) = rows.next().map_err(BackendError::from)? {
        scanned += 1;
        let hash_hex: String = row.get(0).map_err(BackendError::from)?;
        let code: String = row.get(1).map_err(BackendError::from)?;
        let ledger_seq: u32 = row.get(2).map_err(BackendError::from)?;
        let payload: Vec<u8> = row.get(3).map_err(BackendError::from)?;

        let id = match ObjectId::from_hex(&hash_hex) {
            Ok(id) => id,
            Err(err) => {
                warn!(row = scanned, error = %err, "skipping legacy row with malformed hash");
                continue;
            }
        };
        if id.is_null() {
            warn!(row = scanned, "skipping legacy row with null hash");
            continue;
        }
        let kind = ObjectKind::from_code(&code).unwrap_or_else(|| {
            warn!(row = scanned, code = %code, "unrecognized type code; importing as unknown");
            ObjectKind::Unknown
        });

        backend.store(&LedgerObject::new(kind, ledger_seq, payload, id))?;
        written += 1;
        if written % PROGRESS_INTERVAL == 0 {
            info!(written, "legacy import progress");
        }
    }

    info!(written, scanned, source = %path.display(), "legacy import complete");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use rusqlite::params;

    /// Build a legacy source file. The legacy table keys rows by the
    /// hex-encoded hash, not the raw bytes.
    fn create_legacy_db(path: &Path, rows: &[(ObjectId, &str, u32, &[u8])]) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE CommittedObjects (
                Hash        CHARACTER(64) PRIMARY KEY,
                ObjType     CHAR(1) NOT NULL,
                LedgerIndex INTEGER NOT NULL,
                Object      BLOB NOT NULL
            );",
        )
        .unwrap();
        for (id, code, ledger_seq, payload) in rows {
            conn.execute(
                "INSERT INTO CommittedObjects (Hash, ObjType, LedgerIndex, Object) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![id.to_hex(), code, ledger_seq, payload],
            )
            .unwrap();
        }
    }

    #[test]
    fn imports_every_valid_row() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy.db");
        let a = ObjectId::compute(b"ledger row");
        let b = ObjectId::compute(b"tx row");
        let c = ObjectId::compute(b"node row");
        create_legacy_db(
            &legacy,
            &[
                (a, "L", 10, b"ledger row".as_slice()),
                (b, "T", 11, b"tx row".as_slice()),
                (c, "A", 12, b"node row".as_slice()),
            ],
        );

        let backend = MemoryBackend::new();
        let written = run(&legacy, &backend).unwrap();
        assert_eq!(written, 3);
        assert_eq!(backend.len(), 3);

        let fetched = backend.fetch(&b).unwrap().expect("imported");
        assert_eq!(fetched.kind(), ObjectKind::Transaction);
        assert_eq!(fetched.ledger_seq(), 11);
        assert_eq!(fetched.data(), b"tx row");
    }

    #[test]
    fn null_hash_rows_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy.db");
        let good = ObjectId::compute(b"kept");
        create_legacy_db(
            &legacy,
            &[
                (good, "L", 1, b"kept".as_slice()),
                (ObjectId::null(), "T", 2, b"dropped".as_slice()),
            ],
        );

        let backend = MemoryBackend::new();
        let written = run(&legacy, &backend).unwrap();
        assert_eq!(written, 1);
        assert_eq!(backend.len(), 1);
        assert!(backend.contains(&good));
    }

    #[test]
    fn unrecognized_type_codes_import_as_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy.db");
        let good = ObjectId::compute(b"typed");
        let odd = ObjectId::compute(b"mistyped");
        create_legacy_db(
            &legacy,
            &[
                (good, "N", 5, b"typed".as_slice()),
                (odd, "Q", 5, b"mistyped".as_slice()),
            ],
        );

        let backend = MemoryBackend::new();
        assert_eq!(run(&legacy, &backend).unwrap(), 2);
        let fetched = backend.fetch(&good).unwrap().expect("imported");
        assert_eq!(fetched.kind(), ObjectKind::TransactionNode);
        let fetched = backend.fetch(&odd).unwrap().expect("imported despite odd code");
        assert_eq!(fetched.kind(), ObjectKind::Unknown);
    }

    #[test]
    fn malformed_hashes_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy.db");
        let good = ObjectId::compute(b"well formed");
        create_legacy_db(&legacy, &[(good, "L", 1, b"well formed".as_slice())]);

        // Rows whose hash column is not a 64-character hex string.
        let conn = Connection::open(&legacy).unwrap();
        conn.execute(
            "INSERT INTO CommittedObjects (Hash, ObjType, LedgerIndex, Object) \
             VALUES ('abc123', 'T', 2, x'00')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO CommittedObjects (Hash, ObjType, LedgerIndex, Object) \
             VALUES ('not hex at all', 'T', 3, x'00')",
            [],
        )
        .unwrap();
        drop(conn);

        let backend = MemoryBackend::new();
        assert_eq!(run(&legacy, &backend).unwrap(), 1);
        assert_eq!(backend.len(), 1);
        assert!(backend.contains(&good));
    }

    #[test]
    fn empty_source_imports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join("legacy.db");
        create_legacy_db(&legacy, &[]);

        let backend = MemoryBackend::new();
        assert_eq!(run(&legacy, &backend).unwrap(), 0);
        assert!(backend.is_empty());
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MemoryBackend::new();
        assert!(run(&dir.path().join("no-such.db"), &backend).is_err());
    }
}
