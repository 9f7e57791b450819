//! Event-stream decoding
//!
//! Turns the relay's `text/event-stream` body into [`StreamEvent`]s. The
//! decoding itself lives in the synchronous [`SseDecoder`]; [`decode_stream`]
//! adapts it to an async byte stream.

#[cfg(test)]
mod proptests;

use crate::error::ErrorKind;
use futures::stream::{BoxStream, Stream, StreamExt};
use serde::Deserialize;
use std::collections::VecDeque;

/// Sentinel payload marking the end of a completion
const DONE_SENTINEL: &str = "[DONE]";

/// One decoded unit of the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Incremental assistant text
    Delta(String),
    /// Upstream sent the `[DONE]` sentinel
    Done,
    /// The byte stream failed; nothing follows
    Error(ErrorKind, String),
}

/// Boxed, one-shot stream of decoded events
pub type EventStream = BoxStream<'static, StreamEvent>;

// Upstream chunk shape: {"choices":[{"delta":{"content":"..."}}]}

#[derive(Debug, Deserialize)]
struct CompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Incremental line decoder.
///
/// Bytes are buffered raw until a newline arrives, so records (and UTF-8
/// sequences) split across chunks reassemble before parsing.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Prefix of `buffer` already known to hold no newline
    scanned: usize,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk, returning every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if self.done {
            return events;
        }

        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        let mut search = self.scanned;
        while let Some(offset) = self.buffer[search..].iter().position(|&b| b == b'\n') {
            let end = search + offset;
            let event = decode_line(&self.buffer[start..end]);
            start = end + 1;
            search = start;

            if let Some(event) = event {
                let is_done = event == StreamEvent::Done;
                events.push(event);
                if is_done {
                    self.done = true;
                    self.buffer.clear();
                    self.scanned = 0;
                    return events;
                }
            }
        }

        self.buffer.drain(..start);
        self.scanned = self.buffer.len();
        events
    }

    /// Flush at end of input. An unterminated final line is decoded as a record.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.done {
            return Vec::new();
        }
        self.done = true;
        self.scanned = 0;
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest).into_iter().collect()
    }

    /// Whether the `[DONE]` sentinel (or end of input) has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Decode one line (without its `\n`). `None` means "nothing to emit".
fn decode_line(line: &[u8]) -> Option<StreamEvent> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.is_empty() {
        return None;
    }

    let Ok(text) = std::str::from_utf8(line) else {
        tracing::trace!(len = line.len(), "Skipping non-UTF-8 stream line");
        return None;
    };

    // Comments (": keep-alive"), event:, id: and retry: lines carry no text
    let payload = text.strip_prefix("data:")?.trim();
    if payload == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta)
            .and_then(|delta| delta.content)
            .filter(|content| !content.is_empty())
            .map(StreamEvent::Delta),
        Err(e) => {
            tracing::trace!(error = %e, "Skipping malformed stream record");
            None
        }
    }
}

struct DecodeState<B, E> {
    bytes: BoxStream<'static, Result<B, E>>,
    decoder: SseDecoder,
    pending: VecDeque<StreamEvent>,
    closed: bool,
}

/// Decode a byte stream lazily.
///
/// Events come out in record order. The sequence ends after `Done`, after an
/// `Error`, or when the byte stream closes; early closure is not an error.
pub fn decode_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = DecodeState {
        bytes: bytes.boxed(),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        closed: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Some((event, state));
            }
            if state.closed {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let events = state.decoder.push(chunk.as_ref());
                    state.pending.extend(events);
                    state.closed = state.decoder.is_done();
                }
                Some(Err(e)) => {
                    state.closed = true;
                    state
                        .pending
                        .push_back(StreamEvent::Error(ErrorKind::Network, format!("Stream error: {e}")));
                }
                None => {
                    state.closed = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    })
    .boxed()
}

/// Encode `text` the way the upstream frames a content delta
#[cfg(test)]
pub(crate) fn delta_record(text: &str) -> String {
    format!(
        "data: {}\n\n",
        serde_json::json!({"choices": [{"delta": {"content": text}}]})
    )
}
