//! Text codec for the STOMP subset spoken over the chat WebSocket.
//!
//! Every WebSocket text message carries either one whole frame or the bare
//! `"\n"` heartbeat, so the codec works on complete strings rather than on
//! a byte stream. Header values are written verbatim: `:` and newlines
//! inside values are not escaped.

use crate::frame::Frame;

/// The one-byte heartbeat pulse exchanged in both directions.
pub const HEARTBEAT: &str = "\n";

/// Items produced or consumed by the codec.
///
/// A `StompItem` is either a decoded `Frame` or a `Heartbeat` marker
/// representing a bare LF received on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StompItem {
    /// A decoded STOMP frame (command + headers + body)
    Frame(Frame),
    /// A single heartbeat pulse (LF)
    Heartbeat,
}

/// Encode a frame into its wire text.
///
/// Layout: `COMMAND\n`, one `key:value\n` line per header in insertion
/// order, a blank line, the body and a terminating NUL.
pub fn encode_frame(frame: &Frame) -> String {
    let headers_len: usize = frame
        .headers
        .iter()
        .map(|(k, v)| k.len() + v.len() + 2)
        .sum();
    let mut out = String::with_capacity(frame.command.len() + headers_len + frame.body.len() + 3);

    out.push_str(&frame.command);
    out.push('\n');
    for (k, v) in &frame.headers {
        out.push_str(k);
        out.push(':');
        out.push_str(v);
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&frame.body);
    out.push('\0');
    out
}

/// Encode a `StompItem` into wire text.
pub fn encode_item(item: &StompItem) -> String {
    match item {
        StompItem::Heartbeat => HEARTBEAT.to_string(),
        StompItem::Frame(frame) => encode_frame(frame),
    }
}

/// Decode one wire message into a `StompItem`.
///
/// Exactly `"\n"` is a heartbeat and never reaches the frame parser.
/// Anything else goes through [`decode_frame`]; `None` means the message
/// was malformed and has been dropped.
pub fn decode_item(raw: &str) -> Option<StompItem> {
    if raw == HEARTBEAT {
        return Some(StompItem::Heartbeat);
    }
    decode_frame(raw).map(StompItem::Frame)
}

/// Decode a frame from wire text.
///
/// The first line (trimmed) is the command. Following lines are
/// `key:value` pairs split on the first `:` with both sides trimmed, up to
/// the first blank line; lines without a `:` or with an empty key are
/// skipped, and a repeated key keeps its first value. The body is
/// everything after the blank line with trailing NULs stripped; a NUL
/// inside the body is kept.
///
/// Returns `None` (after logging) for empty input or an empty command.
/// Never panics.
pub fn decode_frame(raw: &str) -> Option<Frame> {
    if raw
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .is_empty()
    {
        tracing::warn!(len = raw.len(), "dropping empty STOMP frame");
        return None;
    }

    let (first, mut rest) = split_line(raw);
    let command = first.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    if command.is_empty() {
        tracing::warn!(raw = %raw.escape_debug(), "dropping STOMP frame without a command");
        return None;
    }

    let mut frame = Frame::new(command);
    let mut body = "";
    while let Some(remaining) = rest {
        let (line, tail) = split_line(remaining);
        if line.trim().is_empty() {
            body = tail.unwrap_or("");
            break;
        }
        match line.split_once(':') {
            Some((key, value)) if !key.trim().is_empty() => {
                let key = key.trim();
                if frame.get_header(key).is_none() {
                    frame.headers.push((key.to_string(), value.trim().to_string()));
                }
            }
            _ => {
                tracing::debug!(line = %line.escape_debug(), "skipping malformed header line");
            }
        }
        rest = tail;
    }

    frame.body = body.trim_end_matches('\0').to_string();
    Some(frame)
}

fn split_line(s: &str) -> (&str, Option<&str>) {
    match s.find('\n') {
        Some(i) => (&s[..i], Some(&s[i + 1..])),
        None => (s, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::command;

    #[test]
    fn encode_connect_frame_layout() {
        let f = Frame::new(command::CONNECT)
            .header("accept-version", "1.0,1.1,1.2")
            .header("heart-beat", "10000,10000");
        assert_eq!(
            encode_frame(&f),
            "CONNECT\naccept-version:1.0,1.1,1.2\nheart-beat:10000,10000\n\n\0"
        );
    }

    #[test]
    fn decode_connected_frame() {
        let f = decode_frame("CONNECTED\naccept-version:1.2\nheart-beat:10000,10000\n\n\u{0}")
            .expect("frame");
        assert_eq!(f.command, "CONNECTED");
        assert_eq!(f.get_header("heart-beat"), Some("10000,10000"));
        assert_eq!(f.get_header("accept-version"), Some("1.2"));
        assert!(f.body.is_empty());
    }

    #[test]
    fn lone_newline_is_heartbeat() {
        assert_eq!(decode_item("\n"), Some(StompItem::Heartbeat));
        assert_eq!(encode_item(&StompItem::Heartbeat), "\n");
    }
}
