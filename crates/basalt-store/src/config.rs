use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which engine backs the primary object table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Unordered key-value store (redb).
    Kv,
    /// SQL table (SQLite).
    Sql,
}

impl BackendKind {
    /// Parse a configured backend name.
    ///
    /// Accepts the historical aliases alongside the canonical names; every
    /// other value is unrecognized and treated as a configuration error by
    /// the store constructor.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "KV" | "kv" | "leveldb" | "LevelDB" => Some(Self::Kv),
            "SQL" | "sql" | "sqlite" | "SQLite" => Some(Self::Sql),
            _ => None,
        }
    }
}

/// Process configuration for the object store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection; see [`BackendKind::from_name`] for accepted values.
    pub backend: String,
    /// Primary database location.
    pub path: PathBuf,
    /// Optional ephemeral key-value mirror location. When set, the mirror
    /// is consulted before the primary on reads and receives every batch.
    pub ephemeral_path: Option<PathBuf>,
    /// Relax SQL durability for throwaway processes.
    pub standalone: bool,
    /// Positive-cache entry-count target; 0 disables the size axis.
    pub cache_target_size: usize,
    /// Positive-cache age target in seconds; 0 disables the age axis.
    pub cache_target_age_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "KV".to_string(),
            path: PathBuf::from("objects.redb"),
            ephemeral_path: None,
            standalone: false,
            cache_target_size: 16_384,
            cache_target_age_secs: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_and_aliases() {
        for name in ["KV", "kv", "leveldb", "LevelDB"] {
            assert_eq!(BackendKind::from_name(name), Some(BackendKind::Kv));
        }
        for name in ["SQL", "sql", "sqlite", "SQLite"] {
            assert_eq!(BackendKind::from_name(name), Some(BackendKind::Sql));
        }
    }

    #[test]
    fn unrecognized_names_are_rejected() {
        assert_eq!(BackendKind::from_name(""), None);
        assert_eq!(BackendKind::from_name("rocksdb"), None);
        assert_eq!(BackendKind::from_name("Sqlite"), None);
    }

    #[test]
    fn default_config() {
        let config = StoreConfig::default();
        assert_eq!(BackendKind::from_name(&config.backend), Some(BackendKind::Kv));
        assert!(config.ephemeral_path.is_none());
        assert!(!config.standalone);
        assert_eq!(config.cache_target_size, 16_384);
        assert_eq!(config.cache_target_age_secs, 300);
    }

    #[test]
    fn config_serde_roundtrip() {
        let config = StoreConfig {
            backend: "sqlite".into(),
            path: "/var/lib/basalt/objects.db".into(),
            ephemeral_path: Some("/dev/shm/basalt.redb".into()),
            standalone: true,
            cache_target_size: 1024,
            cache_target_age_secs: 60,
        };
        let json = serde_json::to_string(&config).unwrap();
        let parsed: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.backend, "sqlite");
        assert_eq!(parsed.ephemeral_path, config.ephemeral_path);
        assert_eq!(parsed.cache_target_size, 1024);
    }
}
