use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::message::Message;

/// One stored conversation: the record shape the store keeps whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Timestamp-derived decimal string; newer conversations sort higher.
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: "New Chat".to_string(),
            messages: Vec::new(),
        }
    }
}

/// Generate the next conversation id: current epoch milliseconds as a
/// decimal string, bumped past any existing id so two conversations created
/// within the same millisecond still order correctly.
pub fn next_conversation_id<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let mut id = Utc::now().timestamp_millis();
    if let Some(max) = existing.into_iter().filter_map(numeric_id).max() {
        if id <= max {
            id = max + 1;
        }
    }
    id.to_string()
}

/// Numeric value of a conversation id, for descending history ordering.
/// Ids that fail to parse sort last.
pub fn numeric_id(id: &str) -> Option<i64> {
    id.parse().ok()
}
