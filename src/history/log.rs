use super::storage::{KeyValueStore, MemoryKeyValueStore, open_key_value_store};
use super::{ConversationKey, DeliveryStatus, ImageRef, Message, MessageBody, Sender};
use crate::{
    Error, Result,
    config::{LogLayout, StorageBackend, StorageConfig},
};
use async_trait::async_trait;
use chrono::SecondsFormat;
use libsql::{Builder, Connection, Database, params};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Durable per-conversation message history.
#[async_trait]
pub trait MessageLog: Send + Sync {
    /// Returns the stored history in append order, empty if the key was never written.
    async fn read(&self, key: &ConversationKey) -> Result<Vec<Message>>;

    /// Persists an append. `history` is the full sequence after the append and
    /// `appended` its not-yet-durable messages.
    async fn write(
        &self,
        key: &ConversationKey,
        history: &[Message],
        appended: &[Message],
    ) -> Result<()>;

    fn layout(&self) -> LogLayout;
}

/// Rewrites the whole serialized history under one key on every append.
pub struct SnapshotLog {
    store: Arc<dyn KeyValueStore>,
    key_prefix: String,
}

impl SnapshotLog {
    pub fn new(store: Arc<dyn KeyValueStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }
}

#[async_trait]
impl MessageLog for SnapshotLog {
    async fn read(&self, key: &ConversationKey) -> Result<Vec<Message>> {
        let storage_key = key.storage_key(&self.key_prefix);
        let Some(raw) = self.store.get(&storage_key).await? else {
            debug!("No stored history under: {}", storage_key);
            return Ok(Vec::new());
        };

        let mut messages: Vec<Message> = serde_json::from_str(&raw)?;
        for message in &mut messages {
            message.status = DeliveryStatus::Persisted;
        }
        debug!(
            "Retrieved {} messages from snapshot: {}",
            messages.len(),
            storage_key
        );
        Ok(messages)
    }

    async fn write(
        &self,
        key: &ConversationKey,
        history: &[Message],
        _appended: &[Message],
    ) -> Result<()> {
        let storage_key = key.storage_key(&self.key_prefix);
        let snapshot: Vec<Message> = history
            .iter()
            .cloned()
            .map(|mut m| {
                m.status = DeliveryStatus::Persisted;
                m
            })
            .collect();
        let raw = serde_json::to_string(&snapshot)?;
        self.store.set(&storage_key, &raw).await?;
        debug!(
            "Wrote snapshot of {} messages: {}",
            snapshot.len(),
            storage_key
        );
        Ok(())
    }

    fn layout(&self) -> LogLayout {
        LogLayout::Snapshot
    }
}

/// One row per message in a local libSQL database.
pub struct LibsqlMessageLog {
    _db: Database,
    conn: Connection,
}

impl LibsqlMessageLog {
    pub async fn open(db_path: &str) -> Result<Self> {
        let db = Builder::new_local(db_path).build().await?;
        let conn = db.connect()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_key TEXT NOT NULL,
                message_id TEXT NOT NULL,
                sender TEXT NOT NULL,
                body_kind TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            (),
        )
        .await?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation \
             ON messages (conversation_key, seq)",
            (),
        )
        .await?;

        Ok(Self { _db: db, conn })
    }
}

#[async_trait]
impl MessageLog for LibsqlMessageLog {
    async fn read(&self, key: &ConversationKey) -> Result<Vec<Message>> {
        let mut rows = self
            .conn
            .query(
                "SELECT message_id, sender, body_kind, body, created_at FROM messages \
                 WHERE conversation_key = ? ORDER BY seq ASC",
                [key.as_str()],
            )
            .await?;

        let mut messages = Vec::new();
        while let Some(row) = rows.next().await? {
            let sender: String = row.get(1)?;
            let body_kind: String = row.get(2)?;
            let body: String = row.get(3)?;
            let created_at_str: String = row.get(4)?;

            let body = match body_kind.as_str() {
                "text" => MessageBody::Text(body),
                "image" => MessageBody::Image(ImageRef::new(body)),
                other => return Err(Error::internal(format!("Unknown body kind: {other}"))),
            };
            let created_at = chrono::DateTime::parse_from_rfc3339(&created_at_str)
                .map_err(|e| Error::internal(format!("Failed to parse timestamp: {e}")))?
                .with_timezone(&chrono::Utc);

            let mut message = Message::new(
                row.get::<String>(0)?,
                body,
                Sender::parse(&sender)?,
                created_at,
            );
            message.status = DeliveryStatus::Persisted;
            messages.push(message);
        }

        debug!(
            "Retrieved {} messages from log for conversation: {}",
            messages.len(),
            key
        );
        Ok(messages)
    }

    async fn write(
        &self,
        key: &ConversationKey,
        _history: &[Message],
        appended: &[Message],
    ) -> Result<()> {
        let tx = self.conn.transaction().await?;
        for message in appended {
            let body = match &message.body {
                MessageBody::Text(text) => text.as_str(),
                MessageBody::Image(image) => image.as_str(),
            };
            tx.execute(
                "INSERT INTO messages (conversation_key, message_id, sender, body_kind, body, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    key.as_str(),
                    message.id.as_str(),
                    message.sender.as_str(),
                    message.body.kind(),
                    body,
                    message
                        .created_at
                        .to_rfc3339_opts(SecondsFormat::Nanos, true),
                ],
            )
            .await?;
        }
        tx.commit().await?;

        debug!(
            "Appended {} messages to log for conversation: {}",
            appended.len(),
            key
        );
        Ok(())
    }

    fn layout(&self) -> LogLayout {
        LogLayout::AppendLog
    }
}

/// Builds the configured message log. Database failures degrade to an in-memory snapshot log.
pub async fn open_message_log(config: &StorageConfig) -> Arc<dyn MessageLog> {
    match config.layout {
        LogLayout::Snapshot => {
            let store = open_key_value_store(config).await;
            Arc::new(SnapshotLog::new(store, config.key_prefix.clone()))
        }
        LogLayout::AppendLog => {
            let db_path = match config.backend {
                StorageBackend::Memory => ":memory:",
                StorageBackend::Libsql => config.database_path.as_str(),
            };
            match LibsqlMessageLog::open(db_path).await {
                Ok(log) => {
                    info!("Message log initialized successfully: {}", db_path);
                    Arc::new(log)
                }
                Err(e) => {
                    warn!(
                        "Message log initialization failed, using in-memory fallback: {}",
                        e
                    );
                    Arc::new(SnapshotLog::new(
                        Arc::new(MemoryKeyValueStore::new()),
                        config.key_prefix.clone(),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn key(k: &str) -> ConversationKey {
        ConversationKey::new(k).unwrap()
    }

    fn sample(id: &str, text: &str, minute: u32) -> Message {
        Message::text(id, text).at(Utc.with_ymd_and_hms(2026, 10, 18, 10, minute, 0).unwrap())
    }

    #[tokio::test]
    async fn test_snapshot_writes_under_prefixed_key() {
        let store = MemoryKeyValueStore::new();
        let log = SnapshotLog::new(Arc::new(store.clone()), "messages-");

        let history = vec![sample("1", "Hey!", 30)];
        log.write(&key("42"), &history, &history).await.unwrap();

        let raw = store.get("messages-42").await.unwrap().unwrap();
        let stored: Vec<Message> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, DeliveryStatus::Persisted);
        assert_eq!(store.get("42").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_snapshot_rejects_corrupt_value() {
        let store = MemoryKeyValueStore::new();
        store.set("messages-42", "{not json").await.unwrap();
        let log = SnapshotLog::new(Arc::new(store), "messages-");

        assert!(matches!(
            log.read(&key("42")).await,
            Err(Error::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_append_log_preserves_bodies_and_timestamps() {
        let log = LibsqlMessageLog::open(":memory:").await.unwrap();
        let text = sample("1", "Hey!", 30);
        let image = Message::image("2", ImageRef::new("file:///photo.jpg"))
            .at(Utc.with_ymd_and_hms(2026, 10, 18, 10, 31, 0).unwrap());
        let reply = Message::from_contact("3", "Nice")
            .at(Utc.with_ymd_and_hms(2026, 10, 18, 10, 32, 0).unwrap());

        for m in [&text, &image, &reply] {
            log.write(&key("42"), &[], std::slice::from_ref(m))
                .await
                .unwrap();
        }

        let read = log.read(&key("42")).await.unwrap();
        assert_eq!(read.len(), 3);
        assert_eq!(read[0].body, text.body);
        assert_eq!(read[1].body, image.body);
        assert_eq!(read[2].sender, Sender::Contact);
        assert_eq!(read[1].created_at, image.created_at);
        assert!(read.iter().all(Message::is_persisted));
    }

    #[tokio::test]
    async fn test_append_log_reads_in_insertion_order() {
        let log = LibsqlMessageLog::open(":memory:").await.unwrap();
        let later = sample("1", "sent first", 31);
        let earlier = sample("2", "sent second", 30);

        log.write(&key("7"), &[], std::slice::from_ref(&later))
            .await
            .unwrap();
        log.write(&key("7"), &[], std::slice::from_ref(&earlier))
            .await
            .unwrap();

        let ids: Vec<String> = log
            .read(&key("7"))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id.to_string())
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_open_message_log_memory_append_log() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            layout: LogLayout::AppendLog,
            ..StorageConfig::default()
        };
        let log = open_message_log(&config).await;
        assert_eq!(log.layout(), LogLayout::AppendLog);
    }

    #[tokio::test]
    async fn test_open_message_log_falls_back_to_snapshot() {
        let config = StorageConfig {
            database_path: "/invalid/path/to/database.db".to_string(),
            layout: LogLayout::AppendLog,
            ..StorageConfig::default()
        };
        let log = open_message_log(&config).await;
        assert_eq!(log.layout(), LogLayout::Snapshot);
        assert!(log.read(&key("1")).await.unwrap().is_empty());
    }
}
