//! Integration tests for the gridwalk-core protocol codec.
//!
//! These tests verify complete round-trip encoding and decoding of every
//! message type through the public API, exercising the codec, message types,
//! and domain parameter types together.

use gridwalk_core::{
    decode_message, encode_message,
    protocol::messages::{StateUpdate, HEADER_SIZE, MAX_PAYLOAD},
    SimulationParameters, WalkMessage,
};

/// Encodes a message and then decodes it, asserting that the decoded message
/// matches the original and that every byte was consumed.
fn roundtrip(msg: WalkMessage) -> WalkMessage {
    let bytes = encode_message(&msg);
    let (decoded, consumed) = decode_message(&bytes).expect("decode must succeed");
    assert_eq!(consumed, bytes.len(), "all bytes must be consumed");
    decoded
}

#[test]
fn test_roundtrip_hello_message() {
    let original = WalkMessage::Hello("hello-from-client".to_string());
    assert_eq!(original, roundtrip(original.clone()));
}

#[test]
fn test_roundtrip_hello_ack_message() {
    let original = WalkMessage::HelloAck;
    assert_eq!(original, roundtrip(original.clone()));
}

#[test]
fn test_roundtrip_start_message() {
    let original = WalkMessage::Start(SimulationParameters {
        width: 25,
        height: 40,
        k_max: 1000,
        reps: 12,
        seed: 777,
        p_up: 10,
        p_down: 20,
        p_left: 30,
        p_right: 40,
    });
    assert_eq!(original, roundtrip(original.clone()));
}

#[test]
fn test_roundtrip_state_message() {
    let original = WalkMessage::State(StateUpdate {
        x: 19,
        y: 0,
        step: 164,
        rep: 4,
        reps_total: 12,
    });
    assert_eq!(original, roundtrip(original.clone()));
}

#[test]
fn test_roundtrip_done_message() {
    let original = WalkMessage::Done;
    assert_eq!(original, roundtrip(original.clone()));
}

#[test]
fn test_roundtrip_quit_message() {
    let original = WalkMessage::Quit;
    assert_eq!(original, roundtrip(original.clone()));
}

#[test]
fn test_back_to_back_frames_decode_in_order() {
    // A simulation stream is many frames in one byte sequence; decoding must
    // consume exactly one frame at a time.
    let messages = vec![
        WalkMessage::Hello("client".to_string()),
        WalkMessage::HelloAck,
        WalkMessage::State(StateUpdate {
            x: 5,
            y: 4,
            step: 1,
            rep: 1,
            reps_total: 2,
        }),
        WalkMessage::State(StateUpdate {
            x: 5,
            y: 3,
            step: 2,
            rep: 1,
            reps_total: 2,
        }),
        WalkMessage::Done,
        WalkMessage::Quit,
    ];

    let mut stream = Vec::new();
    for msg in &messages {
        stream.extend_from_slice(&encode_message(msg));
    }

    let mut offset = 0;
    for expected in &messages {
        let (decoded, consumed) = decode_message(&stream[offset..]).expect("decode must succeed");
        assert_eq!(&decoded, expected);
        offset += consumed;
    }
    assert_eq!(offset, stream.len());
}

#[test]
fn test_every_frame_fits_header_plus_max_payload() {
    let messages = [
        WalkMessage::Hello("x".repeat(200)),
        WalkMessage::HelloAck,
        WalkMessage::Start(SimulationParameters {
            width: 2,
            height: 2,
            k_max: 1,
            reps: 1,
            seed: 0,
            p_up: 100,
            p_down: 0,
            p_left: 0,
            p_right: 0,
        }),
        WalkMessage::State(StateUpdate {
            x: 0,
            y: 0,
            step: 1,
            rep: 1,
            reps_total: 1,
        }),
        WalkMessage::Done,
        WalkMessage::Quit,
    ];
    for msg in messages {
        assert!(encode_message(&msg).len() <= HEADER_SIZE + MAX_PAYLOAD);
    }
}
