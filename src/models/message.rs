//! Message records — one turn of a conversation.
//!
//! Serialized field names (`endTag`, `thinkingTime`, `messageId`,
//! `reasoningExpanded`) match the records written by earlier releases, so
//! existing stores load without conversion.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_END_TAG;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Assistant content that may carry a reasoning segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContent {
    /// The full raw model output, reasoning tags included.
    pub raw: String,
    /// Whether the reasoning block is shown expanded.
    pub reasoning_expanded: bool,
}

/// Message body: plain text for user turns (and legacy assistant records),
/// structured for assistant turns that carry a reasoning segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Structured(AssistantContent),
    Text(String),
}

impl MessageContent {
    /// The raw text regardless of shape.
    pub fn raw(&self) -> &str {
        match self {
            Self::Structured(c) => &c.raw,
            Self::Text(s) => s,
        }
    }

    /// Persisted expansion state. Plain-string content has none and
    /// defaults to collapsed at render time.
    pub fn reasoning_expanded(&self) -> Option<bool> {
        match self {
            Self::Structured(c) => Some(c.reasoning_expanded),
            Self::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
    /// The end tag that was active when this assistant message streamed.
    /// Tags are user-configurable; each message remembers its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_tag: Option<String>,
    /// Cumulative thinking duration in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking_time: Option<u64>,
    /// Unique per assistant turn; correlates UI toggle state to history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
            end_tag: None,
            thinking_time: None,
            message_id: None,
        }
    }

    pub fn assistant(
        raw: impl Into<String>,
        end_tag: impl Into<String>,
        thinking_time: Option<u64>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Structured(AssistantContent {
                raw: raw.into(),
                reasoning_expanded: false,
            }),
            end_tag: Some(end_tag.into()),
            thinking_time,
            message_id: Some(Uuid::new_v4().to_string()),
        }
    }

    /// Legacy upgrade: assistant records written before tags became
    /// configurable have no stored end tag. Applied on load.
    pub fn backfill_end_tag(&mut self) {
        if self.role == Role::Assistant && self.end_tag.is_none() {
            self.end_tag = Some(DEFAULT_END_TAG.to_string());
        }
    }

    /// Strip client-side bookkeeping before the message goes to the API.
    pub fn clean_for_api(&self) -> ApiMessage {
        ApiMessage {
            role: self.role,
            content: self.content.raw().to_string(),
        }
    }
}

/// The wire shape the chat endpoints accept: role + flat content only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: Role,
    pub content: String,
}
