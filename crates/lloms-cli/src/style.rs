//! Terminal style helpers using crossterm ANSI escape sequences.
//!
//! One function per conversational surface, replacing shared color handles
//! with plain functions.

use crossterm::style::{Attribute, Color, SetAttribute, SetForegroundColor};

fn colored(text: &str, color: Color) -> String {
    format!(
        "{}{}{}",
        SetForegroundColor(color),
        text,
        SetForegroundColor(Color::Reset)
    )
}

fn colored_bold(text: &str, color: Color) -> String {
    format!(
        "{}{}{}{}{}",
        SetForegroundColor(color),
        SetAttribute(Attribute::Bold),
        text,
        SetAttribute(Attribute::Reset),
        SetForegroundColor(Color::Reset)
    )
}

/// The "You: " input prompt.
pub fn user_prompt() -> String {
    colored_bold("You: ", Color::Cyan)
}

/// The assistant answer prefix.
pub fn assistant_label(name: &str) -> String {
    colored_bold(&format!("{name}: "), Color::Green)
}

/// System notices: banner lines, warnings, farewell.
pub fn notice(text: &str) -> String {
    colored(text, Color::Yellow)
}

/// Tool activity lines.
pub fn tool_line(text: &str) -> String {
    colored(text, Color::Magenta)
}
