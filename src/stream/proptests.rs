//! Property-based tests for stream decoding
//!
//! - Chunk boundaries never change the decoded events
//! - Malformed records never disturb their neighbors
//! - Decoded deltas concatenate to the streamed text

use super::{delta_record, SseDecoder, StreamEvent};
use proptest::prelude::*;

fn decode_chunks(chunks: &[&[u8]]) -> Vec<StreamEvent> {
    let mut decoder = SseDecoder::new();
    let mut events = Vec::new();
    for chunk in chunks {
        events.extend(decoder.push(chunk));
    }
    events.extend(decoder.finish());
    events
}

fn body_for(fragments: &[String], with_sentinel: bool) -> String {
    let mut body: String = fragments.iter().map(|f| delta_record(f)).collect();
    if with_sentinel {
        body.push_str("data: [DONE]\n\n");
    }
    body
}

/// Text fragments including quotes, escapes, newlines and multi-byte chars
fn arb_fragment() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z0-9 .,!?]{1,20}",
        "[\"\\\\\n\t ]{1,5}",
        "[é✨日本語🙂]{1,4}",
    ]
}

/// Lines the upstream may interleave that must produce nothing
fn arb_noise() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(": keep-alive\n\n".to_string()),
        Just("data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n".to_string()),
        Just("data: {not json\n\n".to_string()),
        Just("data: {\"choices\":[{\"delta\":{}\n\n".to_string()),
        Just("event: ping\n".to_string()),
        Just("\n".to_string()),
    ]
}

proptest! {
    #[test]
    fn split_at_any_offset_decodes_identically(
        fragments in proptest::collection::vec(arb_fragment(), 1..6),
        cut in any::<prop::sample::Index>(),
    ) {
        let body = body_for(&fragments, true);
        let bytes = body.as_bytes();
        let at = cut.index(bytes.len() + 1);

        let whole = decode_chunks(&[bytes]);
        let split = decode_chunks(&[&bytes[..at], &bytes[at..]]);
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn arbitrary_chunking_decodes_identically(
        fragments in proptest::collection::vec(arb_fragment(), 1..8),
        sizes in proptest::collection::vec(1usize..16, 1..64),
    ) {
        let body = body_for(&fragments, true);
        let bytes = body.as_bytes();

        let mut chunks: Vec<&[u8]> = Vec::new();
        let mut rest = bytes;
        for size in sizes.iter().cycle() {
            if rest.is_empty() {
                break;
            }
            let (head, tail) = rest.split_at((*size).min(rest.len()));
            chunks.push(head);
            rest = tail;
        }

        prop_assert_eq!(decode_chunks(&[bytes]), decode_chunks(&chunks));
    }

    #[test]
    fn deltas_concatenate_to_streamed_text(
        fragments in proptest::collection::vec(arb_fragment(), 0..10),
    ) {
        let body = body_for(&fragments, true);
        let events = decode_chunks(&[body.as_bytes()]);

        prop_assert_eq!(events.last(), Some(&StreamEvent::Done));
        let text: String = events
            .iter()
            .filter_map(|e| match e {
                StreamEvent::Delta(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        prop_assert_eq!(text, fragments.concat());
    }

    #[test]
    fn noise_between_records_is_invisible(
        fragments in proptest::collection::vec(arb_fragment(), 1..6),
        noise in proptest::collection::vec(arb_noise(), 1..6),
    ) {
        let clean = body_for(&fragments, false);

        let mut noisy = String::new();
        for (i, fragment) in fragments.iter().enumerate() {
            noisy.push_str(&delta_record(fragment));
            noisy.push_str(&noise[i % noise.len()]);
        }

        prop_assert_eq!(
            decode_chunks(&[clean.as_bytes()]),
            decode_chunks(&[noisy.as_bytes()])
        );
    }
}
