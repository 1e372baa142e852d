use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How long a status update stays visible after it is posted.
pub fn status_lifetime() -> Duration {
    Duration::hours(24)
}

/// A contact's status update as shown on the status screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub avatar: String,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub viewed: bool,
}

impl StatusUpdate {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.posted_at >= status_lifetime()
    }

    pub fn time_label(&self, now: DateTime<Utc>) -> String {
        relative_time(self.posted_at, now)
    }
}

/// The local user's own status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyStatus {
    pub posted_at: Option<DateTime<Utc>>,
    pub views: u32,
}

impl MyStatus {
    /// Posts a new status, resetting the view count.
    pub fn post(&mut self, now: DateTime<Utc>) {
        self.posted_at = Some(now);
        self.views = 0;
    }

    pub fn record_view(&mut self) {
        self.views += 1;
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.posted_at
            .is_some_and(|posted| now - posted < status_lifetime())
    }
}

/// Status updates from contacts, split into unviewed and viewed sections.
#[derive(Debug, Clone, Default)]
pub struct StatusFeed {
    updates: Vec<StatusUpdate>,
}

impl StatusFeed {
    pub fn new(updates: Vec<StatusUpdate>) -> Self {
        Self { updates }
    }

    /// Unviewed, unexpired updates, newest first.
    pub fn recent(&self, now: DateTime<Utc>) -> Vec<&StatusUpdate> {
        self.section(now, false)
    }

    /// Viewed, unexpired updates, newest first.
    pub fn viewed(&self, now: DateTime<Utc>) -> Vec<&StatusUpdate> {
        self.section(now, true)
    }

    fn section(&self, now: DateTime<Utc>, viewed: bool) -> Vec<&StatusUpdate> {
        let mut section: Vec<&StatusUpdate> = self
            .updates
            .iter()
            .filter(|u| u.viewed == viewed && !u.is_expired(now))
            .collect();
        section.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        section
    }

    /// Marks an update as seen. Returns `false` for an unknown id.
    pub fn mark_viewed(&mut self, id: &str) -> bool {
        match self.updates.iter_mut().find(|u| u.id == id) {
            Some(update) => {
                update.viewed = true;
                true
            }
            None => false,
        }
    }

    /// Drops updates older than the status lifetime and returns how many were removed.
    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.updates.len();
        self.updates.retain(|u| !u.is_expired(now));
        let removed = before - self.updates.len();
        if removed > 0 {
            debug!("Expired {} status updates", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Coarse "time ago" label used on the status screen.
pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now - then;
    if elapsed < Duration::minutes(1) {
        "Just now".to_string()
    } else if elapsed < Duration::hours(1) {
        plural(elapsed.num_minutes(), "minute")
    } else if elapsed < Duration::hours(24) {
        plural(elapsed.num_hours(), "hour")
    } else if elapsed < Duration::hours(48) {
        "Yesterday".to_string()
    } else {
        then.format("%b %-d").to_string()
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
