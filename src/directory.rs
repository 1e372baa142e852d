use crate::history::ConversationKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Display identity of a conversation counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub last_seen: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: String::new(),
            status: String::new(),
            last_seen: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status.eq_ignore_ascii_case("online")
    }

    /// Header subtitle: `Online`, or `Last seen ...` when known.
    pub fn presence(&self) -> String {
        match (&self.last_seen, self.is_online()) {
            (_, true) => "Online".to_string(),
            (Some(last_seen), false) => format!("Last seen {last_seen}"),
            (None, false) => self.status.clone(),
        }
    }

    pub fn conversation_key(&self) -> Option<ConversationKey> {
        ConversationKey::new(self.id.clone()).ok()
    }
}

/// Case-insensitive substring match; an empty query matches everything.
pub fn name_matches(name: &str, query: &str) -> bool {
    name.to_lowercase().contains(&query.to_lowercase())
}

/// Resolves a conversation key to the counterpart's display identity.
pub trait IdentityDirectory: Send + Sync {
    fn resolve_identity(&self, key: &ConversationKey) -> Option<Identity>;
}

/// Fixed directory, typically seeded from the `contacts` section of the config.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    identities: Vec<Identity>,
    by_id: HashMap<String, usize>,
}

impl StaticDirectory {
    pub fn new(identities: Vec<Identity>) -> Self {
        let mut by_id = HashMap::new();
        for (index, identity) in identities.iter().enumerate() {
            by_id.entry(identity.id.clone()).or_insert(index);
        }
        debug!("Directory loaded with {} identities", identities.len());
        Self { identities, by_id }
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn search(&self, query: &str) -> Vec<&Identity> {
        self.identities
            .iter()
            .filter(|identity| name_matches(&identity.name, query))
            .collect()
    }
}

impl IdentityDirectory for StaticDirectory {
    fn resolve_identity(&self, key: &ConversationKey) -> Option<Identity> {
        self.by_id
            .get(key.as_str())
            .map(|&index| self.identities[index].clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerEntry {
    pub identity: Identity,
    pub selected: bool,
}

/// Contact list of the new-chat screen.
#[derive(Debug, Clone, Default)]
pub struct ContactPicker {
    entries: Vec<PickerEntry>,
}

impl ContactPicker {
    pub fn new(contacts: Vec<Identity>) -> Self {
        Self {
            entries: contacts
                .into_iter()
                .map(|identity| PickerEntry {
                    identity,
                    selected: false,
                })
                .collect(),
        }
    }

    /// Flips selection of the contact with `id`. Returns false if no such contact.
    pub fn toggle(&mut self, id: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.identity.id == id) {
            Some(entry) => {
                entry.selected = !entry.selected;
                true
            }
            None => false,
        }
    }

    pub fn filtered(&self, query: &str) -> Vec<&PickerEntry> {
        self.entries
            .iter()
            .filter(|e| name_matches(&e.identity.name, query))
            .collect()
    }

    pub fn selected_count(&self) -> usize {
        self.entries.iter().filter(|e| e.selected).count()
    }

    /// Conversation to open when the user confirms: the first selected contact.
    pub fn conversation_to_open(&self) -> Option<ConversationKey> {
        self.entries
            .iter()
            .find(|e| e.selected)
            .and_then(|e| e.identity.conversation_key())
    }
}
