use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

/// Identifies one conversation history, one per counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationKey(String);

impl ConversationKey {
    pub fn new(key: impl Into<String>) -> Result<Self> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(Error::InvalidKey(key));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key under which this conversation is persisted in a key-value store.
    pub fn storage_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl TryFrom<String> for ConversationKey {
    type Error = Error;

    fn try_from(key: String) -> Result<Self> {
        Self::new(key)
    }
}

impl TryFrom<&str> for ConversationKey {
    type Error = Error;

    fn try_from(key: &str) -> Result<Self> {
        Self::new(key)
    }
}

impl From<ConversationKey> for String {
    fn from(key: ConversationKey) -> Self {
        key.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MessageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local URI or path of an attached image. Treated opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum MessageBody {
    Text(String),
    Image(ImageRef),
}

impl MessageBody {
    /// Blank bodies are dropped on append instead of being stored.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Image(image) => image.as_str().trim().is_empty(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Image(_) => "image",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Me,
    Contact,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Me => "me",
            Self::Contact => "contact",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "me" => Ok(Self::Me),
            "contact" => Ok(Self::Contact),
            other => Err(Error::internal(format!("Unknown sender: {other}"))),
        }
    }
}

/// Durability of a message, tracked so failed writes can be retried or surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Persisted,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub body: MessageBody,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
    pub status: DeliveryStatus,
}

impl Message {
    pub fn new(
        id: impl Into<MessageId>,
        body: MessageBody,
        sender: Sender,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            body,
            sender,
            created_at,
            status: DeliveryStatus::Pending,
        }
    }

    pub fn text(id: impl Into<MessageId>, text: impl Into<String>) -> Self {
        Self::new(id, MessageBody::Text(text.into()), Sender::Me, Utc::now())
    }

    pub fn image(id: impl Into<MessageId>, image: ImageRef) -> Self {
        Self::new(id, MessageBody::Image(image), Sender::Me, Utc::now())
    }

    pub fn from_contact(id: impl Into<MessageId>, text: impl Into<String>) -> Self {
        Self::new(id, MessageBody::Text(text.into()), Sender::Contact, Utc::now())
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.status == DeliveryStatus::Persisted
    }

    /// Short clock time as shown next to a bubble, e.g. `10:31 AM`.
    pub fn display_time(&self) -> String {
        self.created_at.format("%I:%M %p").to_string()
    }
}

/// Hands out message ids and timestamps that strictly increase within the process.
#[derive(Debug, Default)]
pub struct MessageClock {
    last_millis: AtomicI64,
}

impl MessageClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> (MessageId, DateTime<Utc>) {
        let now = Utc::now().timestamp_millis();
        let mut last = self.last_millis.load(Ordering::Relaxed);
        let millis = loop {
            let candidate = now.max(last + 1);
            match self.last_millis.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break candidate,
                Err(actual) => last = actual,
            }
        };

        let created_at = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_else(Utc::now);
        (MessageId(millis.to_string()), created_at)
    }
}
