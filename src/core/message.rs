use chrono::{DateTime, Local};

use crate::api::HistoryMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

/// One bubble in the transcript.
#[derive(Debug, Clone)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl ConversationEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    pub fn to_history(&self) -> HistoryMessage {
        HistoryMessage {
            role: self.role.as_str().to_string(),
            content: self.content.clone(),
        }
    }
}

/// Append-only, insertion-ordered transcript.
///
/// The first entry is always the seeded greeting. Entries are never removed or
/// reordered; the only mutation allowed after insertion is replacing the
/// content of the trailing assistant entry while it is being streamed.
#[derive(Debug, Clone)]
pub struct ConversationLog {
    entries: Vec<ConversationEntry>,
}

impl ConversationLog {
    pub fn seeded(greeting: impl Into<String>) -> Self {
        Self {
            entries: vec![ConversationEntry::assistant(greeting)],
        }
    }

    pub fn push(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.entries.len().checked_sub(1)
    }

    /// Replace the content of the entry at `index`.
    ///
    /// Only the trailing entry is eligible, and only when it is an assistant
    /// entry. Returns `false` and leaves the log untouched otherwise.
    pub fn replace_content_at(&mut self, index: usize, content: impl Into<String>) -> bool {
        if Some(index) != self.last_index() {
            return false;
        }
        match self.entries.get_mut(index) {
            Some(entry) if entry.is_assistant() => {
                entry.content = content.into();
                true
            }
            _ => false,
        }
    }

    /// Everything after the seeded greeting, in wire form.
    pub fn history_snapshot(&self) -> Vec<HistoryMessage> {
        self.entries
            .iter()
            .skip(1)
            .map(ConversationEntry::to_history)
            .collect()
    }
}
