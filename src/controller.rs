//! Conversation controller
//!
//! Drives one round-trip at a time: optimistic user turn, relay call, delta
//! accumulation, then commit or rollback. The transcript it owns is the
//! single source of truth for rendering.

pub mod state;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use state::{Effect, RoundTripEvent, RoundTripState};

use crate::client::ChatTransport;
use crate::error::ChatError;
use crate::stream::StreamEvent;
use crate::transcript::{Conversation, PendingReply, Turn};
use futures::StreamExt;
use state::transition;
use std::ops::{Deref, DerefMut};
use tokio_util::sync::CancellationToken;

/// Receives round-trip progress. Every method defaults to a no-op.
pub trait ChatObserver: Send {
    fn on_delta(&mut self, _text: &str) {}

    fn on_done(&mut self) {}

    fn on_error(&mut self, _error: &ChatError) {}
}

impl ChatObserver for () {}

/// Owns one conversation and the round-trips made on it
pub struct ConversationController<T> {
    transport: T,
    conversation: Conversation,
    state: RoundTripState,
    /// Transcript length before the current round-trip
    checkpoint: usize,
    pending: Option<PendingReply>,
}

impl<T: ChatTransport> ConversationController<T> {
    pub fn new(transport: T) -> Self {
        Self::with_conversation(transport, Conversation::new())
    }

    pub fn with_conversation(transport: T, conversation: Conversation) -> Self {
        let checkpoint = conversation.len();
        Self {
            transport,
            conversation,
            state: RoundTripState::Idle,
            checkpoint,
            pending: None,
        }
    }

    /// Finalized turns, plus the user turn of an in-flight round-trip
    pub fn transcript(&self) -> &Conversation {
        &self.conversation
    }

    /// Text streamed so far for the reply under construction
    pub fn pending_reply(&self) -> Option<&str> {
        self.pending.as_ref().map(PendingReply::content)
    }

    pub fn state(&self) -> &RoundTripState {
        &self.state
    }

    pub fn into_transcript(self) -> Conversation {
        self.conversation
    }

    /// Run one round-trip for `input`.
    ///
    /// Returns the committed assistant turn, or `None` if the stream finished
    /// without any text. On failure the transcript is left exactly as it was
    /// before the call.
    pub async fn send_conversation(
        &mut self,
        input: &str,
        observer: &mut dyn ChatObserver,
    ) -> Result<Option<Turn>, ChatError> {
        self.send_conversation_with_cancel(input, observer, CancellationToken::new())
            .await
    }

    /// Like [`Self::send_conversation`], aborting when `cancel` fires.
    ///
    /// Cancellation before the stream finishes rolls the round-trip back, as
    /// does dropping the returned future.
    pub async fn send_conversation_with_cancel(
        &mut self,
        input: &str,
        observer: &mut dyn ChatObserver,
        cancel: CancellationToken,
    ) -> Result<Option<Turn>, ChatError> {
        let text = input.trim();
        if text.is_empty() {
            return Err(ChatError::empty_input());
        }

        let mut round = InFlight { controller: self };
        round.apply(
            RoundTripEvent::Submit {
                text: text.to_string(),
            },
            observer,
        )?;

        tracing::debug!(
            conversation_id = %round.conversation.id(),
            turns = round.conversation.len(),
            "Sending conversation"
        );

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ChatError::cancelled()),
            result = round.transport.open(round.conversation.turns()) => result,
        };
        let mut events = match opened {
            Ok(events) => events,
            Err(err) => return round.fail(err, observer),
        };

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return round.fail(ChatError::cancelled(), observer),
                next = events.next() => next,
            };

            match next {
                Some(StreamEvent::Delta(delta)) => round.apply(RoundTripEvent::Delta(delta), observer)?,
                // Closing without [DONE] counts as completion
                Some(StreamEvent::Done) | None => break,
                Some(StreamEvent::Error(kind, message)) => {
                    return round.fail(ChatError::new(kind, message), observer);
                }
            }
        }

        round.apply(RoundTripEvent::Finished, observer)?;

        let reply = if round.conversation.len() > round.checkpoint + 1 {
            round.conversation.last().cloned()
        } else {
            None
        };

        tracing::info!(
            conversation_id = %round.conversation.id(),
            turns = round.conversation.len(),
            reply_len = reply.as_ref().map_or(0, |t| t.content.len()),
            "Round-trip completed"
        );

        Ok(reply)
    }

    /// Roll back, notify, and hand the error back to the caller
    fn fail(
        &mut self,
        err: ChatError,
        observer: &mut dyn ChatObserver,
    ) -> Result<Option<Turn>, ChatError> {
        tracing::warn!(
            conversation_id = %self.conversation.id(),
            kind = ?err.kind,
            error = %err.message,
            "Round-trip rolled back"
        );
        self.apply(RoundTripEvent::Failed(err.clone()), observer)?;
        Err(err)
    }

    fn apply(
        &mut self,
        event: RoundTripEvent,
        observer: &mut dyn ChatObserver,
    ) -> Result<(), ChatError> {
        let result = transition(&self.state, event)?;
        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect, observer);
        }
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect, observer: &mut dyn ChatObserver) {
        match effect {
            Effect::AppendUserTurn(text) => {
                self.checkpoint = self.conversation.len();
                self.conversation.push(Turn::user(text));
            }
            Effect::OpenReply => self.pending = Some(PendingReply::new()),
            Effect::AppendReply(text) => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.append(&text);
                }
            }
            Effect::CommitReply => {
                if let Some(pending) = self.pending.take() {
                    tracing::debug!(deltas = pending.deltas(), "Committing reply");
                    self.conversation.push(pending.finish());
                }
            }
            Effect::Rollback => {
                self.pending = None;
                self.conversation.truncate(self.checkpoint);
            }
            Effect::NotifyDelta(text) => observer.on_delta(&text),
            Effect::NotifyDone => observer.on_done(),
            Effect::NotifyError(err) => observer.on_error(&err),
        }
    }
}

/// Rolls back a round-trip whose future is dropped before it settles
struct InFlight<'a, T: ChatTransport> {
    controller: &'a mut ConversationController<T>,
}

impl<T: ChatTransport> Deref for InFlight<'_, T> {
    type Target = ConversationController<T>;

    fn deref(&self) -> &Self::Target {
        self.controller
    }
}

impl<T: ChatTransport> DerefMut for InFlight<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.controller
    }
}

impl<T: ChatTransport> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if !self.controller.state.is_busy() {
            return;
        }
        tracing::warn!(
            conversation_id = %self.controller.conversation.id(),
            state = self.controller.state.name(),
            "Rolling back abandoned round-trip"
        );
        if let Err(e) = self
            .controller
            .apply(RoundTripEvent::Failed(ChatError::cancelled()), &mut ())
        {
            tracing::error!(error = %e, "Failed to roll back abandoned round-trip");
        }
    }
}
