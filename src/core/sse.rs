//! Server-sent event reassembly.
//!
//! Chunk boundaries reported by the transport have nothing to do with event
//! boundaries: one event may straddle several chunks and one chunk may hold
//! any number of events. [`SseDecoder`] buffers raw bytes, hands out every
//! fully delimited event, and carries the undelimited remainder over to the
//! next chunk. Buffering bytes rather than text also keeps multi-byte UTF-8
//! sequences that are split across chunks intact.

use memchr::memmem;

use crate::api::TokenFrame;
use crate::core::constants::{DATA_PREFIX, DONE_SENTINEL};

const EVENT_DELIMITER: &[u8] = b"\n\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Incremental text fragment.
    Token(String),
    /// Terminator sentinel.
    Done,
    /// Payload that could not be understood. Carries the raw payload for logs.
    Malformed(String),
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one transport chunk, returning every event it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        // CRLF streams become LF streams; bare CR never appears inside JSON payloads.
        self.buffer
            .extend(chunk.iter().copied().filter(|&byte| byte != b'\r'));

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = memmem::find(&self.buffer[consumed..], EVENT_DELIMITER) {
            let end = consumed + offset;
            if let Some(frame) = parse_event(&self.buffer[consumed..end]) {
                frames.push(frame);
            }
            consumed = end + EVENT_DELIMITER.len();
        }
        self.buffer.drain(..consumed);
        frames
    }

    /// Flush whatever is left once the transport reports end of body.
    pub fn finish(&mut self) -> Vec<SseFrame> {
        let remainder = std::mem::take(&mut self.buffer);
        parse_event(&remainder).into_iter().collect()
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

fn parse_event(raw: &[u8]) -> Option<SseFrame> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(_) => return Some(SseFrame::Malformed(String::from_utf8_lossy(raw).into_owned())),
    };

    let data_lines: Vec<&str> = text
        .split('\n')
        .filter(|line| !line.starts_with(':'))
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .collect();

    if data_lines.is_empty() {
        return None;
    }

    classify_payload(&data_lines.join("\n"))
}

fn classify_payload(payload: &str) -> Option<SseFrame> {
    let trimmed = payload.trim();
    if trimmed == DONE_SENTINEL {
        return Some(SseFrame::Done);
    }
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<TokenFrame>(trimmed) {
        Ok(frame) if frame.token.is_empty() => None,
        Ok(frame) => Some(SseFrame::Token(frame.token)),
        Err(_) => Some(SseFrame::Malformed(trimmed.to_string())),
    }
}
