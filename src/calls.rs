use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Incoming,
    Outgoing,
    Missed,
}

impl CallKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Incoming => "Incoming",
            Self::Outgoing => "Outgoing",
            Self::Missed => "Missed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub id: String,
    pub contact_id: String,
    pub contact_name: String,
    #[serde(default)]
    pub contact_avatar: String,
    #[serde(rename = "type")]
    pub kind: CallKind,
    pub timestamp: String,
    pub duration: String,
    /// Display date label the list is grouped by, e.g. `Today`.
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallGroup {
    pub date: String,
    pub calls: Vec<CallRecord>,
}

/// Groups calls by date label, keeping first-appearance order of dates and of calls within a date.
pub fn group_by_date(calls: &[CallRecord]) -> Vec<CallGroup> {
    let mut groups: Vec<CallGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for call in calls {
        let slot = *index.entry(call.date.as_str()).or_insert_with(|| {
            groups.push(CallGroup {
                date: call.date.clone(),
                calls: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].calls.push(call.clone());
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn call(id: &str, kind: CallKind, date: &str) -> CallRecord {
        CallRecord {
            id: id.to_string(),
            contact_id: "1".to_string(),
            contact_name: "Alex Johnson".to_string(),
            contact_avatar: String::new(),
            kind,
            timestamp: "10:30 AM".to_string(),
            duration: "2:15".to_string(),
            date: date.to_string(),
        }
    }

    #[test]
    fn test_group_by_date_keeps_order() {
        let calls = vec![
            call("1", CallKind::Incoming, "Today"),
            call("2", CallKind::Missed, "Yesterday"),
            call("3", CallKind::Outgoing, "Today"),
            call("4", CallKind::Missed, "Monday"),
        ];

        let groups = group_by_date(&calls);
        let dates: Vec<&str> = groups.iter().map(|g| g.date.as_str()).collect();
        assert_eq!(dates, vec!["Today", "Yesterday", "Monday"]);

        let today: Vec<&str> = groups[0].calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(today, vec!["1", "3"]);
    }

    #[test]
    fn test_group_by_date_empty() {
        assert!(group_by_date(&[]).is_empty());
    }

    #[test]
    fn test_call_record_json_shape() {
        let json = r#"{
            "id": "1",
            "contact_id": "2",
            "contact_name": "Sarah Miller",
            "type": "missed",
            "timestamp": "9:20 AM",
            "duration": "0:00",
            "date": "Yesterday"
        }"#;
        let record: CallRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, CallKind::Missed);
        assert_eq!(record.kind.label(), "Missed");
        assert_eq!(record.contact_avatar, "");
    }
}
