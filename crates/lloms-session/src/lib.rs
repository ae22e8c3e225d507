//! In-memory conversation log and history windowing for LLoms.

pub mod error;
pub mod store;
pub mod window;

pub use error::StorageError;
pub use store::{ConversationLog, MessageId};
pub use window::select_window;
