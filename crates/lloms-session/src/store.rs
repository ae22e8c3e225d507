//! Append-only conversation log.
//!
//! Messages live in an ordered sequence so insertion order is the retrieval
//! order; the id set exists only to reject duplicate identifiers. The log is
//! created empty at session start and never truncated during the session.

use crate::error::StorageError;
use chrono::Utc;
use lloms_types::ChatMessage;
use std::collections::HashSet;
use std::fmt;

/// Identifier of a stored message: a nanosecond timestamp, bumped as needed
/// so ids generated by one log are strictly increasing. Used only for
/// storage addressing, never interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub i64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Ordered, identifier-keyed, append-only log of chat messages.
#[derive(Debug, Default)]
pub struct ConversationLog {
    entries: Vec<(MessageId, ChatMessage)>,
    ids: HashSet<MessageId>,
    last_id: i64,
}

impl ConversationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message under a freshly generated identifier.
    pub fn save(&mut self, message: ChatMessage) -> Result<MessageId, StorageError> {
        let id = self.next_id();
        self.save_with_id(id, message)?;
        Ok(id)
    }

    /// Append a message under an explicit identifier. Fails if the identifier
    /// is already present.
    pub fn save_with_id(
        &mut self,
        id: MessageId,
        message: ChatMessage,
    ) -> Result<(), StorageError> {
        if !self.ids.insert(id) {
            return Err(StorageError::DuplicateId { id });
        }
        self.last_id = self.last_id.max(id.0);
        self.entries.push((id, message));
        Ok(())
    }

    /// Every stored message in insertion order. An empty log yields an empty
    /// sequence, not an error.
    pub fn all(&self) -> Vec<ChatMessage> {
        self.entries.iter().map(|(_, m)| m.clone()).collect()
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn next_id(&self) -> MessageId {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or(self.last_id);
        MessageId(nanos.max(self.last_id + 1))
    }
}
