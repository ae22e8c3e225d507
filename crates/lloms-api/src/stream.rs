//! Async stream adapter that turns the NDJSON response body into typed chunks.

use crate::ndjson::LineParser;
use futures_core::Stream;
use lloms_types::{ApiError, ChatResponse};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

pin_project! {
    /// An ordered stream of [`ChatResponse`] chunks decoded from a streaming
    /// `/api/chat` body. Chunks are yielded strictly in arrival order; one
    /// network chunk may complete several lines, which are queued and drained
    /// one per poll.
    pub struct ChatStream {
        #[pin]
        inner: Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
        parser: LineParser,
        ready: VecDeque<Result<ChatResponse, ApiError>>,
    }
}

impl ChatStream {
    /// Wrap a reqwest byte stream.
    pub fn new(
        byte_stream: impl Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            parser: LineParser::new(),
            ready: VecDeque::new(),
        }
    }
}

impl Stream for ChatStream {
    type Item = Result<ChatResponse, ApiError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if let Some(item) = this.ready.pop_front() {
                return Poll::Ready(Some(item));
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    let text = String::from_utf8_lossy(&bytes);
                    for line in this.parser.feed(&text) {
                        this.ready.push_back(decode_line(&line));
                    }
                    // Fall through: drain whatever the chunk completed, or
                    // poll for more bytes if it completed nothing.
                }
                Poll::Ready(Some(Err(e))) => {
                    return Poll::Ready(Some(Err(ApiError::Network(e.to_string()))));
                }
                Poll::Ready(None) => {
                    let remainder = this.parser.remainder().trim().to_string();
                    if !remainder.is_empty() {
                        // Body ended without a final newline; decode the tail.
                        this.parser.feed("\n");
                        return Poll::Ready(Some(decode_line(&remainder)));
                    }
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

fn decode_line(line: &str) -> Result<ChatResponse, ApiError> {
    serde_json::from_str(line).map_err(|e| ApiError::StreamParse(format!("{e}: {line}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_line_parses_chunk() {
        let chunk = decode_line(r#"{"message":{"role":"assistant","content":"Hi"},"done":false}"#)
            .unwrap();
        assert_eq!(chunk.message.content, "Hi");
        assert!(!chunk.done);
    }

    #[test]
    fn decode_line_reports_malformed_json() {
        let err = decode_line("{not json").unwrap_err();
        assert!(matches!(err, ApiError::StreamParse(_)));
    }
}
