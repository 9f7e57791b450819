//! Streaming chat relay
//!
//! A stateless HTTP relay that forwards a conversation to an upstream
//! completion service and streams the reply back verbatim, plus the client
//! side that decodes that stream into text deltas and folds them into a
//! transcript.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate, clippy::module_name_repetitions)]

pub mod client;
pub mod controller;
pub mod error;
pub mod relay;
pub mod stream;
pub mod system_prompt;
pub mod transcript;

pub use client::{ChatTransport, ClientConfig, RelayClient};
pub use controller::{ChatObserver, ConversationController, RoundTripState};
pub use error::{ChatError, ErrorKind};
pub use stream::{decode_stream, EventStream, SseDecoder, StreamEvent};
pub use transcript::{Conversation, PendingReply, Role, Turn};
