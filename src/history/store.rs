use super::log::{MessageLog, open_message_log};
use super::{ConversationKey, DeliveryStatus, Message, MessageClock, MessageId};
use crate::{
    Error, Result,
    config::{LogLayout, StorageConfig},
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Per-conversation append-only message log with a synchronous in-memory view.
///
/// Appends are optimistic: the view is updated before the write is attempted
/// and is not rolled back if the write fails. Failed messages keep a
/// [`DeliveryStatus::Failed`] tag until [`ConversationStore::retry_failed`]
/// persists them.
pub struct ConversationStore {
    log: Arc<dyn MessageLog>,
    views: Mutex<HashMap<ConversationKey, Vec<Message>>>,
    clock: MessageClock,
}

impl ConversationStore {
    pub fn new(log: Arc<dyn MessageLog>) -> Self {
        Self {
            log,
            views: Mutex::new(HashMap::new()),
            clock: MessageClock::new(),
        }
    }

    pub async fn from_config(config: &StorageConfig) -> Self {
        Self::new(open_message_log(config).await)
    }

    pub fn clock(&self) -> &MessageClock {
        &self.clock
    }

    fn lock_views(&self) -> Result<MutexGuard<'_, HashMap<ConversationKey, Vec<Message>>>> {
        self.views
            .lock()
            .map_err(|e| Error::internal(format!("Mutex lock failed: {e}")))
    }

    /// Reads the durable history for `key` and makes it the current view.
    pub async fn load(&self, key: &ConversationKey) -> Result<Vec<Message>> {
        let messages = self
            .log
            .read(key)
            .await
            .map_err(|e| Error::storage_unavailable(key.as_str(), e))?;

        debug!(
            "Loaded {} messages for conversation: {}",
            messages.len(),
            key
        );
        self.lock_views()?.insert(key.clone(), messages.clone());
        Ok(messages)
    }

    /// Like [`load`](Self::load), but an unreadable history is treated as empty.
    pub async fn load_or_empty(&self, key: &ConversationKey) -> Vec<Message> {
        match self.load(key).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Proceeding with empty history: {}", e);
                if let Ok(mut views) = self.lock_views() {
                    views.entry(key.clone()).or_default();
                }
                Vec::new()
            }
        }
    }

    /// Current in-memory sequence for `key`, including messages not yet persisted.
    pub fn view(&self, key: &ConversationKey) -> Result<Vec<Message>> {
        Ok(self.lock_views()?.get(key).cloned().unwrap_or_default())
    }

    /// Appends `message` to the conversation and persists the result.
    ///
    /// Blank bodies, and messages whose id is already in the view, are ignored
    /// and return the current view. On a write failure the message stays in the
    /// view marked failed and `StorageWriteFailed` is returned.
    pub async fn append(&self, key: &ConversationKey, message: Message) -> Result<Vec<Message>> {
        if message.body.is_blank() {
            debug!("Ignoring blank message for conversation: {}", key);
            return self.view(key);
        }

        let loaded = self.lock_views()?.contains_key(key);
        if !loaded {
            self.load_or_empty(key).await;
        }

        let mut message = message;
        message.status = DeliveryStatus::Pending;

        let history = {
            let mut views = self.lock_views()?;
            let view = views.entry(key.clone()).or_default();
            if view.iter().any(|m| m.id == message.id) {
                debug!(
                    "Ignoring message with duplicate id {} for conversation: {}",
                    message.id, key
                );
                return Ok(view.clone());
            }
            view.push(message.clone());
            view.clone()
        };

        self.persist(key, history, vec![message]).await
    }

    /// Re-persists messages whose earlier write failed.
    pub async fn retry_failed(&self, key: &ConversationKey) -> Result<Vec<Message>> {
        let (history, failed) = {
            let mut views = self.lock_views()?;
            let Some(view) = views.get_mut(key) else {
                return Ok(Vec::new());
            };
            let mut failed = Vec::new();
            for message in view.iter_mut() {
                if message.status == DeliveryStatus::Failed {
                    message.status = DeliveryStatus::Pending;
                    failed.push(message.clone());
                }
            }
            (view.clone(), failed)
        };

        if failed.is_empty() {
            return Ok(history);
        }

        debug!(
            "Retrying {} failed messages for conversation: {}",
            failed.len(),
            key
        );
        self.persist(key, history, failed).await
    }

    /// Evicts the in-memory view for `key` unless it still holds messages that
    /// are not durable. Returns whether the view is gone.
    pub fn close(&self, key: &ConversationKey) -> bool {
        let Ok(mut views) = self.lock_views() else {
            return false;
        };
        let settled = views
            .get(key)
            .is_none_or(|view| view.iter().all(Message::is_persisted));
        if settled && views.remove(key).is_some() {
            debug!("Closed conversation: {}", key);
        }
        settled
    }

    /// Messages in the view that are not yet durable.
    pub fn pending(&self, key: &ConversationKey) -> Result<Vec<Message>> {
        Ok(self
            .view(key)?
            .into_iter()
            .filter(|m| !m.is_persisted())
            .collect())
    }

    async fn persist(
        &self,
        key: &ConversationKey,
        history: Vec<Message>,
        appended: Vec<Message>,
    ) -> Result<Vec<Message>> {
        let outcome = self.log.write(key, &history, &appended).await;

        let layout = self.log.layout();
        let (status, touched): (DeliveryStatus, HashSet<MessageId>) = match (&outcome, layout) {
            (Ok(()), LogLayout::Snapshot) => (
                DeliveryStatus::Persisted,
                history.iter().map(|m| m.id.clone()).collect(),
            ),
            (Ok(()), LogLayout::AppendLog) => (
                DeliveryStatus::Persisted,
                appended.iter().map(|m| m.id.clone()).collect(),
            ),
            (Err(_), _) => (
                DeliveryStatus::Failed,
                appended.iter().map(|m| m.id.clone()).collect(),
            ),
        };

        let updated = {
            let mut views = self.lock_views()?;
            let view = views.entry(key.clone()).or_default();
            for message in view.iter_mut().filter(|m| touched.contains(&m.id)) {
                message.status = status;
            }
            view.clone()
        };

        match outcome {
            Ok(()) => {
                debug!(
                    "Persisted conversation {} with {} messages",
                    key,
                    updated.len()
                );
                Ok(updated)
            }
            Err(e) => {
                warn!("Failed to persist conversation {}: {}", key, e);
                Err(Error::storage_write_failed(key.as_str(), e))
            }
        }
    }
}
