//! Shared helpers for the client tests: an in-memory connector and a few
//! wire-level shortcuts.

#![allow(dead_code)]

use chat_stomp::codec::{self, StompItem};
use chat_stomp::connection::ConnError;
use chat_stomp::transport::TransportCommand;
use chat_stomp::{
    ClientConfig, ClientStatus, Connector, EventSink, Frame, StompClient, TransportEvent,
    TransportSession,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub const CONNECTED: &str = "CONNECTED\naccept-version:1.2\nheart-beat:10000,10000\n\n\u{0}";

/// What the connector does when asked to open a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBehavior {
    /// Hand back a session and let the test drive it.
    Manual,
    /// Report `Failed` straight away.
    FailImmediately,
    /// Refuse to build a session at all.
    Reject,
}

/// One session opened by [`MockConnector`], seen from the server side.
pub struct MockSession {
    pub url: String,
    pub sink: EventSink,
    pub outbound: mpsc::UnboundedReceiver<TransportCommand>,
}

impl MockSession {
    pub fn open(&self) {
        self.sink.emit(TransportEvent::Opened);
    }

    pub fn server_send(&self, text: &str) {
        self.sink.emit(TransportEvent::Text(text.to_string()));
    }

    pub fn server_binary(&self, data: &[u8]) {
        self.sink.emit(TransportEvent::Binary(data.to_vec()));
    }

    pub fn server_frame(&self, frame: &Frame) {
        self.server_send(&codec::encode_frame(frame));
    }

    pub fn close(&self, code: u16, reason: &str) {
        self.sink.emit(TransportEvent::Closed {
            code: Some(code),
            reason: reason.to_string(),
        });
    }

    /// Everything the client has queued so far.
    pub fn drain(&mut self) -> Vec<TransportCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = self.outbound.try_recv() {
            out.push(cmd);
        }
        out
    }

    /// Queued frames, skipping heartbeats and close requests.
    pub fn drain_frames(&mut self) -> Vec<Frame> {
        self.drain()
            .into_iter()
            .filter_map(|cmd| match cmd {
                TransportCommand::Text(text) => match codec::decode_item(&text) {
                    Some(StompItem::Frame(frame)) => Some(frame),
                    _ => None,
                },
                TransportCommand::Close { .. } => None,
            })
            .collect()
    }
}

#[derive(Default)]
struct MockState {
    opened: Vec<String>,
    sessions: VecDeque<MockSession>,
}

/// Connector that never touches the network.
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
    behavior: Arc<Mutex<OpenBehavior>>,
}

impl MockConnector {
    pub fn new(behavior: OpenBehavior) -> Self {
        Self {
            state: Arc::default(),
            behavior: Arc::new(Mutex::new(behavior)),
        }
    }

    pub fn set_behavior(&self, behavior: OpenBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().unwrap().opened.len()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.state.lock().unwrap().opened.clone()
    }

    /// The oldest session not yet handed to the test.
    pub fn take_session(&self) -> MockSession {
        self.state
            .lock()
            .unwrap()
            .sessions
            .pop_front()
            .expect("no session was opened")
    }
}

impl Connector for MockConnector {
    fn open(&self, url: &str, events: EventSink) -> Result<TransportSession, ConnError> {
        let behavior = *self.behavior.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        state.opened.push(url.to_string());
        match behavior {
            OpenBehavior::Reject => Err(ConnError::Transport("rejected by mock".into())),
            OpenBehavior::FailImmediately => {
                let (tx, _rx) = mpsc::unbounded_channel();
                events.emit(TransportEvent::Failed("connection refused".into()));
                Ok(TransportSession::new(tx))
            }
            OpenBehavior::Manual => {
                let (tx, rx) = mpsc::unbounded_channel();
                state.sessions.push_back(MockSession {
                    url: url.to_string(),
                    sink: events,
                    outbound: rx,
                });
                Ok(TransportSession::new(tx))
            }
        }
    }
}

pub fn test_config() -> ClientConfig {
    ClientConfig::new("ws://chat.test/ws", 7, 3).unwrap()
}

pub fn new_client(config: ClientConfig, behavior: OpenBehavior) -> (StompClient, MockConnector) {
    let connector = MockConnector::new(behavior);
    let client = StompClient::with_connector(config, Arc::new(connector.clone()));
    client.initialize();
    (client, connector)
}

/// Let the driver work through everything queued, then take a snapshot.
pub async fn settle(client: &StompClient) -> ClientStatus {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    client.status().await.expect("client not initialized")
}

/// Connect, open the transport, answer CONNECTED and clear the outbound
/// queue.
pub async fn connected(config: ClientConfig) -> (StompClient, MockConnector, MockSession) {
    let (client, connector) = new_client(config, OpenBehavior::Manual);
    client.connect(None, None);
    settle(&client).await;
    let mut session = connector.take_session();
    session.open();
    settle(&client).await;
    session.server_send(CONNECTED);
    settle(&client).await;
    session.drain();
    (client, connector, session)
}

pub fn message(subscription: &str, destination: &str, body: &str) -> Frame {
    Frame::new("MESSAGE")
        .header("subscription", subscription)
        .header("destination", destination)
        .header("message-id", "m-1")
        .set_body(body)
}
