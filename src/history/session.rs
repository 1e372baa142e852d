use super::{
    ConversationKey, ConversationStore, DeliveryStatus, ImageRef, Message, MessageBody, Sender,
};
use crate::Result;
use crate::directory::{Identity, IdentityDirectory};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of asking the device gallery for a single image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickedImage {
    Cancelled,
    Picked(ImageRef),
}

#[async_trait]
pub trait ImagePicker: Send + Sync {
    async fn pick_image(&self) -> Result<PickedImage>;
}

/// The history of one open conversation, as owned by the screen displaying it.
///
/// Appends go through `&mut self`, so a session never has two writes in flight.
pub struct ConversationSession {
    store: Arc<ConversationStore>,
    key: ConversationKey,
    messages: Vec<Message>,
}

impl ConversationSession {
    /// Opens a conversation. Unreadable history is treated as empty.
    pub async fn open(store: Arc<ConversationStore>, key: ConversationKey) -> Self {
        let messages = store.load_or_empty(&key).await;
        debug!(
            "Opened conversation {} with {} messages",
            key,
            messages.len()
        );
        Self {
            store,
            key,
            messages,
        }
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn identity(&self, directory: &dyn IdentityDirectory) -> Option<Identity> {
        directory.resolve_identity(&self.key)
    }

    /// Sends a text message from the local user. Blank input is ignored.
    pub async fn send_text(&mut self, text: impl Into<String>) -> &[Message] {
        let text = text.into();
        if text.trim().is_empty() {
            return &self.messages;
        }
        self.send(MessageBody::Text(text)).await
    }

    /// Lets the user pick an image and sends it. A cancelled pick changes nothing.
    pub async fn attach_image(&mut self, picker: &dyn ImagePicker) -> Result<&[Message]> {
        match picker.pick_image().await? {
            PickedImage::Cancelled => {
                debug!("Image pick cancelled for conversation: {}", self.key);
                Ok(&self.messages)
            }
            PickedImage::Picked(image) => Ok(self.send(MessageBody::Image(image)).await),
        }
    }

    /// Re-sends anything that failed to persist earlier.
    pub async fn retry_failed(&mut self) -> &[Message] {
        let result = self.store.retry_failed(&self.key).await;
        match result {
            Ok(messages) => self.messages = messages,
            Err(e) => {
                warn!("Retry failed for conversation {}: {}", self.key, e);
                self.refresh_from_view();
            }
        }
        &self.messages
    }

    async fn send(&mut self, body: MessageBody) -> &[Message] {
        let (id, created_at) = self.store.clock().next();
        let message = Message::new(id, body, Sender::Me, created_at);

        let result = self.store.append(&self.key, message.clone()).await;
        match result {
            Ok(messages) => self.messages = messages,
            Err(e) => {
                warn!("Message kept locally after failed send: {}", e);
                if !self.refresh_from_view() {
                    let mut message = message;
                    message.status = DeliveryStatus::Failed;
                    self.messages.push(message);
                }
            }
        }
        &self.messages
    }

    fn refresh_from_view(&mut self) -> bool {
        match self.store.view(&self.key) {
            Ok(messages) => {
                self.messages = messages;
                true
            }
            Err(_) => false,
        }
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        if !self.store.close(&self.key) {
            debug!("Keeping unsent messages for conversation: {}", self.key);
        }
    }
}
