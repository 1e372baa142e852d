use crate::{
    Error, Result,
    config::{StorageBackend, StorageConfig},
};
use async_trait::async_trait;
use libsql::{Builder, Connection, Database};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// String-keyed persistence boundary. `set` replaces the whole value.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Process-local store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Key-value table in a local libSQL database.
pub struct LibsqlKeyValueStore {
    _db: Database,
    conn: Connection,
}

impl LibsqlKeyValueStore {
    pub async fn open(db_path: &str) -> Result<Self> {
        let db = Builder::new_local(db_path).build().await?;
        let conn = db.connect()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            "#,
            (),
        )
        .await?;

        Ok(Self { _db: db, conn })
    }
}

#[async_trait]
impl KeyValueStore for LibsqlKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv_store WHERE key = ?", [key])
            .await?;

        match rows.next().await? {
            Some(row) => {
                let value: String = row.get(0)?;
                debug!("Read {} bytes for key: {}", value.len(), key);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                [key, value],
            )
            .await?;
        debug!("Wrote {} bytes for key: {}", value.len(), key);
        Ok(())
    }
}

/// Opens the configured key-value backend, falling back to memory if the database cannot be opened.
pub async fn open_key_value_store(config: &StorageConfig) -> Arc<dyn KeyValueStore> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory key-value store");
            Arc::new(MemoryKeyValueStore::new())
        }
        StorageBackend::Libsql => match LibsqlKeyValueStore::open(&config.database_path).await {
            Ok(store) => {
                info!("Database initialized successfully: {}", config.database_path);
                Arc::new(store)
            }
            Err(e) => {
                warn!(
                    "Database initialization failed, using in-memory fallback: {}",
                    e
                );
                Arc::new(MemoryKeyValueStore::new())
            }
        },
    }
}
