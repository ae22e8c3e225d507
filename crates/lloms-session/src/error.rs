//! Conversation store error types.

use crate::store::MessageId;
use thiserror::Error;

/// Errors from the conversation log.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Message id {id} already exists in the conversation log")]
    DuplicateId { id: MessageId },
}
