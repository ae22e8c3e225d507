//! Events emitted while processing one turn, for streaming UI.

/// What the session reports to the output surface during a turn.
#[derive(Debug)]
pub enum TurnEvent {
    /// A text fragment from the streaming assistant response, in arrival order.
    TextDelta(String),
    /// A tool is about to be invoked.
    ToolCallStarted {
        name: String,
        arguments: serde_json::Value,
    },
    /// A tool invocation finished with the given textual result.
    ToolCallCompleted { name: String, text: String },
    /// A recoverable failure; the turn continues (or is abandoned) without it.
    Warning(String),
    /// The assistant response is complete and has been stored.
    Done,
}
