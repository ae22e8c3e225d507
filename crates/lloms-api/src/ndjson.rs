//! Incremental NDJSON line splitter.
//!
//! The streaming `/api/chat` body is newline-delimited JSON. Bytes arrive in
//! arbitrary chunks, so a partial trailing line is buffered until its
//! terminator shows up.

/// Splits an incrementally fed byte stream into complete lines.
pub struct LineParser {
    buffer: String,
}

impl LineParser {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feed a chunk of text and return the complete lines it finished.
    /// Blank lines are dropped; a trailing `\r` is stripped.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);
        let mut lines = Vec::new();

        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].trim_end_matches('\r').to_string();
            self.buffer.drain(..=pos);
            if !line.is_empty() {
                lines.push(line);
            }
        }

        lines
    }

    /// Whatever is buffered after the last newline. A well-formed NDJSON body
    /// ends with a newline, leaving this empty.
    pub fn remainder(&self) -> &str {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_complete_line() {
        let mut parser = LineParser::new();
        let lines = parser.feed("{\"done\":false}\n");
        assert_eq!(lines, vec!["{\"done\":false}"]);
        assert!(parser.remainder().is_empty());
    }

    #[test]
    fn multiple_lines_in_one_chunk() {
        let mut parser = LineParser::new();
        let lines = parser.feed("{\"a\":1}\n{\"b\":2}\n{\"c\":3}\n");
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}", "{\"c\":3}"]);
    }

    #[test]
    fn line_split_across_chunks() {
        let mut parser = LineParser::new();
        assert!(parser.feed("{\"content\":\"he").is_empty());
        assert_eq!(parser.remainder(), "{\"content\":\"he");
        let lines = parser.feed("llo\"}\n");
        assert_eq!(lines, vec!["{\"content\":\"hello\"}"]);
        assert!(parser.remainder().is_empty());
    }

    #[test]
    fn crlf_terminators_are_stripped() {
        let mut parser = LineParser::new();
        let lines = parser.feed("{\"a\":1}\r\n{\"b\":2}\r\n");
        assert_eq!(lines, vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn blank_lines_are_dropped() {
        let mut parser = LineParser::new();
        let lines = parser.feed("\n\n{\"a\":1}\n\n");
        assert_eq!(lines, vec!["{\"a\":1}"]);
    }

    #[test]
    fn newline_alone_completes_buffered_line() {
        let mut parser = LineParser::new();
        assert!(parser.feed("{\"a\":1}").is_empty());
        let lines = parser.feed("\n");
        assert_eq!(lines, vec!["{\"a\":1}"]);
    }
}
