//! Property-based tests for the controller
//!
//! These tests verify key invariants hold across arbitrary streams:
//! - A completed reply is the in-order concatenation of its deltas
//! - A failed round-trip leaves the transcript exactly as it found it
//! - The state machine never accepts a second submission mid-flight

use super::state::{transition, RoundTripEvent, RoundTripState, TransitionError};
use super::testing::{MockTransport, Reply};
use super::ConversationController;
use crate::error::ChatError;
use crate::stream::delta_record;
use crate::transcript::{Conversation, Turn};
use proptest::prelude::*;

fn run<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

fn arb_delta() -> impl Strategy<Value = String> {
    prop_oneof!["[a-zA-Z0-9 .,]{1,12}", "[é✨\n\"]{1,3}"]
}

fn arb_history() -> impl Strategy<Value = Vec<Turn>> {
    proptest::collection::vec(("[a-z ]{1,10}", "[a-z ]{1,10}"), 0..4).prop_map(|pairs| {
        pairs
            .into_iter()
            .flat_map(|(q, a)| [Turn::user(q), Turn::assistant(a)])
            .collect()
    })
}

fn arb_event() -> impl Strategy<Value = RoundTripEvent> {
    prop_oneof![
        "[a-z]{1,5}".prop_map(|text| RoundTripEvent::Submit { text }),
        "[a-z]{1,5}".prop_map(RoundTripEvent::Delta),
        Just(RoundTripEvent::Finished),
        Just(RoundTripEvent::Failed(ChatError::network("boom"))),
    ]
}

proptest! {
    #[test]
    fn completed_reply_is_concatenation_of_deltas(
        deltas in proptest::collection::vec(arb_delta(), 1..10),
        with_sentinel in any::<bool>(),
        chunk_size in 1usize..32,
    ) {
        let mut body: String = deltas.iter().map(|d| delta_record(d)).collect();
        if with_sentinel {
            body.push_str("data: [DONE]\n\n");
        }
        // Re-chunk on char boundaries so chunks stay valid Strings
        let chars: Vec<char> = body.chars().collect();
        let chunks: Vec<Result<String, String>> = chars
            .chunks(chunk_size)
            .map(|c| Ok(c.iter().collect()))
            .collect();

        let transport = MockTransport::new();
        transport.queue(Reply::Chunks(chunks));
        let mut controller = ConversationController::new(transport);

        let reply = run(controller.send_conversation("question", &mut ())).unwrap();
        prop_assert_eq!(reply, Some(Turn::assistant(deltas.concat())));
        prop_assert_eq!(controller.transcript().len(), 2);
    }

    #[test]
    fn failed_round_trip_restores_transcript(
        history in arb_history(),
        delivered in proptest::collection::vec(arb_delta(), 0..5),
        refuse in any::<bool>(),
    ) {
        let transport = MockTransport::new();
        if refuse {
            transport.queue(Reply::Refuse(ChatError::rate_limited("slow down")));
        } else {
            let mut chunks: Vec<Result<String, String>> =
                delivered.iter().map(|d| Ok(delta_record(d))).collect();
            chunks.push(Err("connection reset".to_string()));
            transport.queue(Reply::Chunks(chunks));
        }

        let mut controller = ConversationController::with_conversation(
            transport,
            Conversation::with_turns(history.clone()),
        );
        let result = run(controller.send_conversation("question", &mut ()));

        prop_assert!(result.is_err());
        prop_assert_eq!(controller.transcript().turns(), history.as_slice());
        prop_assert!(controller.pending_reply().is_none());
    }

    #[test]
    fn at_most_one_round_trip_in_flight(
        events in proptest::collection::vec(arb_event(), 0..40),
    ) {
        let mut state = RoundTripState::Idle;
        let mut last_deltas = 0;

        for event in events {
            let was_busy = state.is_busy();
            let is_submit = matches!(event, RoundTripEvent::Submit { .. });

            match transition(&state, event) {
                Ok(result) => {
                    prop_assert!(!(was_busy && is_submit), "Accepted submit while busy");
                    if let RoundTripState::Streaming { deltas } = result.new_state {
                        prop_assert!(deltas == last_deltas + 1, "Delta count must grow by one");
                        last_deltas = deltas;
                    } else {
                        last_deltas = 0;
                    }
                    state = result.new_state;
                }
                Err(TransitionError::Busy) => prop_assert!(was_busy && is_submit),
                Err(TransitionError::InvalidTransition(_)) => prop_assert!(!was_busy),
            }
        }
    }
}
