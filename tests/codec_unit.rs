//! Unit tests for frame encoding and decoding.

use chat_stomp::codec::{HEARTBEAT, decode_frame, decode_item, encode_frame, encode_item};
use chat_stomp::{Frame, StompItem};
use rand::Rng;
use rand::distributions::Alphanumeric;

// =============================================================================
// Encoding
// =============================================================================

#[test]
fn encode_subscribe_frame_exact_bytes() {
    let frame = Frame::new("SUBSCRIBE")
        .header("id", "sub-1")
        .header("destination", "/topic/x");
    assert_eq!(
        encode_frame(&frame),
        "SUBSCRIBE\nid:sub-1\ndestination:/topic/x\n\n\u{0}"
    );
}

#[test]
fn encode_frame_with_body() {
    let frame = Frame::new("SEND").header("destination", "/a").set_body("{\"x\":1}");
    assert_eq!(encode_frame(&frame), "SEND\ndestination:/a\n\n{\"x\":1}\u{0}");
}

#[test]
fn encode_heartbeat_item() {
    assert_eq!(encode_item(&StompItem::Heartbeat), "\n");
    assert_eq!(HEARTBEAT, "\n");
}

// =============================================================================
// Decoding
// =============================================================================

#[test]
fn decode_connected_frame() {
    let frame = decode_frame("CONNECTED\naccept-version:1.2\nheart-beat:10000,10000\n\n\u{0}")
        .unwrap();
    assert_eq!(frame.command, "CONNECTED");
    assert_eq!(frame.get_header("heart-beat"), Some("10000,10000"));
    assert!(frame.body.is_empty());
}

#[test]
fn decode_bare_newline_is_heartbeat() {
    assert_eq!(decode_item("\n"), Some(StompItem::Heartbeat));
}

#[test]
fn decode_empty_input_is_dropped() {
    assert_eq!(decode_frame(""), None);
    assert_eq!(decode_frame("\u{0}"), None);
    assert_eq!(decode_item("  \n\n"), None);
}

#[test]
fn decode_header_value_keeps_later_colons() {
    let frame = decode_frame("MESSAGE\ndestination:/topic/a:b\n\nbody\u{0}").unwrap();
    assert_eq!(frame.get_header("destination"), Some("/topic/a:b"));
}

#[test]
fn decode_trims_header_whitespace() {
    let frame = decode_frame("MESSAGE\n subscription : sub-1 \n\n\u{0}").unwrap();
    assert_eq!(frame.get_header("subscription"), Some("sub-1"));
}

#[test]
fn decode_skips_malformed_header_lines() {
    let frame = decode_frame("MESSAGE\nnot a header\n:novalue\nid:1\n\n\u{0}").unwrap();
    assert_eq!(frame.headers, vec![("id".to_string(), "1".to_string())]);
}

#[test]
fn decode_repeated_header_keeps_first() {
    let frame = decode_frame("MESSAGE\nid:first\nid:second\n\n\u{0}").unwrap();
    assert_eq!(frame.get_header("id"), Some("first"));
    assert_eq!(frame.headers.len(), 1);
}

#[test]
fn decode_strips_only_trailing_nuls() {
    let frame = decode_frame("MESSAGE\nsubscription:sub-1\n\na\u{0}b\u{0}").unwrap();
    assert_eq!(frame.body, "a\u{0}b");

    let frame = decode_frame("MESSAGE\nid:1\n\nhello\u{0}\u{0}\u{0}").unwrap();
    assert_eq!(frame.body, "hello");
}

#[test]
fn decode_keeps_text_after_inner_nul() {
    let frame = decode_frame("MESSAGE\nid:1\n\nhello\u{0}trailing").unwrap();
    assert_eq!(frame.body, "hello\u{0}trailing");
}

#[test]
fn decode_without_blank_line_has_empty_body() {
    let frame = decode_frame("RECEIPT\nreceipt-id:77").unwrap();
    assert_eq!(frame.get_header("receipt-id"), Some("77"));
    assert!(frame.body.is_empty());
}

#[test]
fn decode_body_may_contain_newlines() {
    let frame = decode_frame("MESSAGE\nid:1\n\nline one\nline two\u{0}").unwrap();
    assert_eq!(frame.body, "line one\nline two");
}

#[test]
fn decode_never_panics_on_garbage() {
    for raw in ["\u{0}\u{0}", ":\n:\n", "\n\nMESSAGE", "X\n\n\n\n", "é:ü\n\n"] {
        let _ = decode_item(raw);
    }
}

// =============================================================================
// Round trip
// =============================================================================

fn random_token(rng: &mut impl Rng, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[test]
fn random_frames_survive_encode_decode() {
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let command_len = rng.gen_range(1..=10);
        let command = random_token(&mut rng, command_len).to_uppercase();
        let mut frame = Frame::new(command);
        for i in 0..rng.gen_range(0..6) {
            let key_len = rng.gen_range(1..=8);
            let value_len = rng.gen_range(0..16);
            let key = format!("{}-{}", random_token(&mut rng, key_len), i);
            let value = random_token(&mut rng, value_len);
            frame.set_header(key, value);
        }
        let body_len = rng.gen_range(0..64);
        frame.body = random_token(&mut rng, body_len);

        let decoded = decode_frame(&encode_frame(&frame)).unwrap();
        assert_eq!(decoded.command, frame.command);
        assert_eq!(decoded.body, frame.body);
        let mut expected = frame.headers.clone();
        let mut actual = decoded.headers.clone();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }
}
