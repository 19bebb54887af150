//! Incremental decoder for Ollama's newline-delimited JSON replies.

use serde::Deserialize;

/// One line of a generate reply. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct GenerateLine {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// What a decoded line means to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Frame {
    /// A non-empty text fragment.
    Text(String),
    /// The backend finished.
    Done,
    /// The backend reported an error mid-reply.
    Failed(String),
    /// The line was not valid JSON of the expected shape.
    Malformed(String),
}

/// Buffers raw body bytes and yields frames for each complete line.
#[derive(Debug, Default)]
pub(crate) struct NdjsonDecoder {
    buffer: Vec<u8>,
}

impl NdjsonDecoder {
    /// Feeds `bytes` and decodes every line they complete.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            frames.extend(parse_line(&line));
        }
        frames
    }

    /// Decodes whatever is left once the body has ended.
    pub(crate) fn finish(&mut self) -> Vec<Frame> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(line: &[u8]) -> Vec<Frame> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Vec::new();
    }
    let parsed: GenerateLine = match serde_json::from_slice(line) {
        Ok(parsed) => parsed,
        Err(e) => return vec![Frame::Malformed(e.to_string())],
    };

    if let Some(error) = parsed.error {
        return vec![Frame::Failed(error)];
    }
    let mut frames = Vec::with_capacity(2);
    if let Some(text) = parsed.response.filter(|t| !t.is_empty()) {
        frames.push(Frame::Text(text));
    }
    if parsed.done {
        frames.push(Frame::Done);
    }
    frames
}
