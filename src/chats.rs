use crate::directory::{IdentityDirectory, name_matches};
use crate::history::{ConversationKey, Message, MessageBody, Sender};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One row of the chat list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatSummary {
    pub key: ConversationKey,
    pub name: String,
    pub avatar: String,
    pub last_message: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub unread_count: usize,
}

impl ChatSummary {
    /// Summarizes a history. Returns `None` when the key has no known identity.
    pub fn from_history(
        key: &ConversationKey,
        messages: &[Message],
        directory: &dyn IdentityDirectory,
    ) -> Option<Self> {
        let identity = directory.resolve_identity(key)?;
        let last = messages.last();

        Some(Self {
            key: key.clone(),
            name: identity.name,
            avatar: identity.avatar,
            last_message: last.map(preview).unwrap_or_default(),
            timestamp: last.map(|m| m.created_at),
            unread_count: unread_count(messages),
        })
    }
}

fn preview(message: &Message) -> String {
    match &message.body {
        MessageBody::Text(text) => text.clone(),
        MessageBody::Image(_) => "Photo".to_string(),
    }
}

/// Counterpart messages received after the local user's last message.
pub fn unread_count(messages: &[Message]) -> usize {
    messages
        .iter()
        .rev()
        .take_while(|m| m.sender == Sender::Contact)
        .count()
}

/// Builds the chat list, newest conversation first, skipping unknown keys.
pub fn chat_list<'a, I>(histories: I, directory: &dyn IdentityDirectory) -> Vec<ChatSummary>
where
    I: IntoIterator<Item = (&'a ConversationKey, &'a [Message])>,
{
    let mut summaries: Vec<ChatSummary> = histories
        .into_iter()
        .filter_map(|(key, messages)| ChatSummary::from_history(key, messages, directory))
        .collect();
    summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    summaries
}

pub fn filter_chats<'a>(summaries: &'a [ChatSummary], query: &str) -> Vec<&'a ChatSummary> {
    summaries
        .iter()
        .filter(|s| name_matches(&s.name, query))
        .collect()
}
