//! Unit tests for the Frame struct.

use chat_stomp::Frame;
use chat_stomp::frame::command;

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn frame_new_creates_empty() {
    let frame = Frame::new("SEND");
    assert_eq!(frame.command, "SEND");
    assert!(frame.headers.is_empty());
    assert!(frame.body.is_empty());
}

#[test]
fn frame_new_with_string() {
    let cmd = String::from("MESSAGE");
    let frame = Frame::new(cmd);
    assert_eq!(frame.command, "MESSAGE");
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn header_appends_in_order() {
    let frame = Frame::new(command::SUBSCRIBE)
        .header("id", "sub-1")
        .header("destination", "/topic/x");
    assert_eq!(
        frame.headers,
        vec![
            ("id".to_string(), "sub-1".to_string()),
            ("destination".to_string(), "/topic/x".to_string()),
        ]
    );
}

#[test]
fn header_replaces_existing_key_in_place() {
    let frame = Frame::new(command::SEND)
        .header("destination", "/a")
        .header("content-type", "text/plain")
        .header("destination", "/b");
    assert_eq!(frame.headers.len(), 2);
    assert_eq!(frame.headers[0], ("destination".to_string(), "/b".to_string()));
}

#[test]
fn set_header_mutates_in_place() {
    let mut frame = Frame::new(command::CONNECT);
    frame.set_header("login", "7");
    frame.set_header("login", "8");
    assert_eq!(frame.get_header("login"), Some("8"));
    assert_eq!(frame.headers.len(), 1);
}

#[test]
fn get_header_is_case_sensitive() {
    let frame = Frame::new(command::CONNECT).header("JWT-TOKEN", "t");
    assert_eq!(frame.get_header("JWT-TOKEN"), Some("t"));
    assert_eq!(frame.get_header("jwt-token"), None);
}

#[test]
fn get_header_missing_returns_none() {
    assert_eq!(Frame::new(command::SEND).get_header("destination"), None);
}

// =============================================================================
// Body and Display Tests
// =============================================================================

#[test]
fn set_body_replaces_body() {
    let frame = Frame::new(command::SEND).set_body("one").set_body("two");
    assert_eq!(frame.body, "two");
}

#[test]
fn is_matches_command() {
    let frame = Frame::new(command::MESSAGE);
    assert!(frame.is(command::MESSAGE));
    assert!(!frame.is(command::ERROR));
}

#[test]
fn display_lists_command_headers_and_body_size() {
    let frame = Frame::new(command::SEND)
        .header("destination", "/app/dm/native/send")
        .set_body("hello");
    let text = format!("{}", frame);
    assert!(text.contains("Command: SEND"));
    assert!(text.contains("destination: /app/dm/native/send"));
    assert!(text.contains("Body (5 bytes)"));
}
