//! Append-only conversation log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Ai,
}

/// A single conversation entry. Never mutated after append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub speaker: Speaker,
    /// Append time; serialized as an RFC 3339 timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Ordered log of conversation messages.
///
/// Single source of truth for transcript history: insertion order is
/// chronological order, and there is no mutation or removal API.
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Mutex<Vec<Message>>,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user message and returns the stored entry.
    pub fn push_user(&self, content: impl Into<String>) -> Message {
        self.push(Speaker::User, content.into())
    }

    /// Appends an assistant message and returns the stored entry.
    pub fn push_ai(&self, content: impl Into<String>) -> Message {
        self.push(Speaker::Ai, content.into())
    }

    /// Returns a snapshot of the full history, in append order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn push(&self, speaker: Speaker, content: String) -> Message {
        let message = Message {
            content,
            speaker,
            timestamp: Utc::now(),
        };
        self.lock().push(message.clone());
        message
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Message>> {
        match self.messages.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
