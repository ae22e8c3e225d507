//! Conversation orchestration for LLoms.
//!
//! Drives one user turn at a time: bounded-history derivation, the optional
//! tool invocation gate, and the streaming chat turn. All state lives in an
//! explicit [`ChatSession`] constructed at startup; there are no globals.

mod event;
mod gate;
mod session;
mod turn;

pub use event::TurnEvent;
pub use gate::ToolGate;
pub use session::{ChatSession, SessionConfig};
pub use turn::{ChatTurn, TurnStatus};
