use super::mocks::FlakyKeyValueStore;
use chat_store::{
    config::{LogLayout, StorageBackend, StorageConfig},
    history::{
        ConversationKey, ConversationStore, KeyValueStore, LibsqlMessageLog, Message,
        MessageLog, SnapshotLog,
    },
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tempfile::TempDir;

pub const KEY_PREFIX: &str = "messages-";

/// Create a temporary directory for test files
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp directory")
}

pub fn key(k: &str) -> ConversationKey {
    ConversationKey::new(k).expect("valid conversation key")
}

/// Fixed timestamps on 2026-10-18, one per minute after 10:00.
pub fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 10, minute, 0).unwrap()
}

pub fn text(id: &str, body: &str, minute: u32) -> Message {
    Message::text(id, body).at(at(minute))
}

pub fn snapshot_log(store: Arc<dyn KeyValueStore>) -> Arc<dyn MessageLog> {
    Arc::new(SnapshotLog::new(store, KEY_PREFIX))
}

/// Store over a flaky key-value backend, returning the backend for fault injection.
pub fn flaky_store() -> (FlakyKeyValueStore, Arc<ConversationStore>) {
    let kv = FlakyKeyValueStore::new();
    let store = ConversationStore::new(snapshot_log(Arc::new(kv.clone())));
    (kv, Arc::new(store))
}

/// File-backed storage config for the given layout.
pub fn file_config(dir: &TempDir, layout: LogLayout) -> StorageConfig {
    StorageConfig {
        backend: StorageBackend::Libsql,
        database_path: dir.path().join("chat.db").to_string_lossy().to_string(),
        key_prefix: KEY_PREFIX.to_string(),
        layout,
    }
}

pub async fn append_log(dir: &TempDir) -> Arc<dyn MessageLog> {
    let path = dir.path().join("log.db");
    Arc::new(
        LibsqlMessageLog::open(&path.to_string_lossy())
            .await
            .expect("open message log"),
    )
}

/// Generate unique conversation key for tests
pub fn generate_test_key() -> ConversationKey {
    key(&uuid::Uuid::new_v4().to_string())
}

pub fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.id.to_string()).collect()
}
