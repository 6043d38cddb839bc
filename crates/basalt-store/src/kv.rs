use std::path::Path;
use std::sync::Arc;

use redb::{Database, TableDefinition};
use tracing::debug;

use basalt_types::ObjectId;

use crate::backend::Backend;
use crate::codec;
use crate::error::BackendResult;
use crate::object::LedgerObject;

const OBJECTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("objects");

/// Unordered key-value backend over redb.
///
/// Keys are the raw 32-byte object ids; values use the shared header layout
/// from [`crate::codec`]. A batch is one redb write transaction, so it
/// commits atomically.
pub struct KvBackend {
    db: Database,
}

impl KvBackend {
    /// Open (or create) the database file at `path`.
    pub fn open(path: &Path) -> BackendResult<Self> {
        let db = Database::create(path).map_err(redb::Error::from)?;

        // Materialize the table so reads on a fresh database see it.
        let txn = db.begin_write().map_err(redb::Error::from)?;
        txn.open_table(OBJECTS).map_err(redb::Error::from)?;
        txn.commit().map_err(redb::Error::from)?;

        debug!(path = %path.display(), "opened key-value backend");
        Ok(Self { db })
    }
}

impl Backend for KvBackend {
    fn label(&self) -> &'static str {
        "kv"
    }

    fn fetch(&self, id: &ObjectId) -> BackendResult<Option<LedgerObject>> {
        let txn = self.db.begin_read().map_err(redb::Error::from)?;
        let table = txn.open_table(OBJECTS).map_err(redb::Error::from)?;

        let Some(guard) = table
            .get(id.as_bytes().as_slice())
            .map_err(redb::Error::from)?
        else {
            return Ok(None);
        };
        codec::decode(*id, guard.value()).map(Some)
    }

    fn store(&self, object: &LedgerObject) -> BackendResult<()> {
        let txn = self.db.begin_write().map_err(redb::Error::from)?;
        {
            let mut table = txn.open_table(OBJECTS).map_err(redb::Error::from)?;
            let value = codec::encode(object);
            table
                .insert(object.id().as_bytes().as_slice(), value.as_slice())
                .map_err(redb::Error::from)?;
        }
        txn.commit().map_err(redb::Error::from)?;
        Ok(())
    }

    fn store_batch(&self, batch: &[Arc<LedgerObject>]) -> BackendResult<()> {
        let txn = self.db.begin_write().map_err(redb::Error::from)?;
        {
            let mut table = txn.open_table(OBJECTS).map_err(redb::Error::from)?;
            for object in batch {
                let value = codec::encode(object);
                table
                    .insert(object.id().as_bytes().as_slice(), value.as_slice())
                    .map_err(redb::Error::from)?;
            }
        }
        txn.commit().map_err(redb::Error::from)?;
        Ok(())
    }
}
