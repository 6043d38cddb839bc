use basalt_types::ObjectId;
use thiserror::Error;

/// Errors from the durable backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// I/O error from the underlying storage engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure inside the key-value engine.
    #[error("key-value backend error: {0}")]
    Kv(#[from] redb::Error),

    /// Failure inside the SQL engine.
    #[error("sql backend error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// A stored value could not be decoded back into an object.
    #[error("undecodable object {id}: {reason}")]
    Corrupt { id: ObjectId, reason: String },
}

impl BackendError {
    /// Corrupt rows are the only recoverable backend failure: the facade
    /// logs them, negative-caches the id, and reports a miss. Everything
    /// else is structural and halts the process.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

/// Errors surfaced by store construction and the legacy importer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The configured backend name is not one of the recognized values.
    #[error("unrecognized backend selection '{0}'")]
    UnknownBackend(String),

    /// The operation requires a primary backend but none is configured.
    #[error("no primary backend configured")]
    Disabled,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Result alias for store-level operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
