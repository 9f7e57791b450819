//! Mock implementations for testing
//!
//! These mocks drive the controller without a relay or a UI.

use super::ChatObserver;
use crate::client::ChatTransport;
use crate::error::ChatError;
use crate::stream::{decode_stream, EventStream};
use crate::transcript::Turn;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Scripted relay behaviour for one round-trip
#[derive(Debug)]
pub enum Reply {
    /// Raw body chunks; `Err` simulates a transport failure at that point
    Chunks(Vec<Result<String, String>>),
    /// Deliver the chunks, then never close the stream
    Hang(Vec<Result<String, String>>),
    /// Relay answered with an error instead of a stream
    Refuse(ChatError),
}

/// Transport that replays queued replies through the real decoder
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    /// Record of every conversation sent
    requests: Mutex<Vec<Vec<Turn>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn recorded_requests(&self) -> Vec<Vec<Turn>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn open(&self, turns: &[Turn]) -> Result<EventStream, ChatError> {
        self.requests.lock().unwrap().push(turns.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Refuse(ChatError::network("No mock reply queued")));

        match reply {
            Reply::Chunks(chunks) => Ok(decode_stream(futures::stream::iter(chunks))),
            Reply::Hang(chunks) => Ok(decode_stream(
                futures::stream::iter(chunks).chain(futures::stream::pending()),
            )),
            Reply::Refuse(err) => Err(err),
        }
    }
}

/// Observer that keeps every callback for later assertions
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub deltas: Vec<String>,
    pub done: usize,
    pub errors: Vec<ChatError>,
}

impl ChatObserver for RecordingObserver {
    fn on_delta(&mut self, text: &str) {
        self.deltas.push(text.to_string());
    }

    fn on_done(&mut self) {
        self.done += 1;
    }

    fn on_error(&mut self, error: &ChatError) {
        self.errors.push(error.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{delta_record, StreamEvent};

    #[tokio::test]
    async fn mock_replays_queue_then_refuses() {
        let mock = MockTransport::new();
        mock.queue(Reply::Chunks(vec![Ok(delta_record("hi"))]));

        let events: Vec<_> = mock.open(&[Turn::user("q")]).await.unwrap().collect().await;
        assert_eq!(events, vec![StreamEvent::Delta("hi".into())]);

        let Err(err) = mock.open(&[]).await else {
            panic!("Expected empty queue to refuse");
        };
        assert_eq!(err.kind, crate::error::ErrorKind::Network);
        assert_eq!(mock.recorded_requests().len(), 2);
    }
}
