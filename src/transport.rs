//! WebSocket transport sessions.
//!
//! A [`Connector`] opens one session per call and reports what happens on
//! it through an [`EventSink`]. The connection driver talks to the session
//! only through the returned [`TransportSession`] handle; dropping that
//! handle ends the session.
//!
//! [`WsConnector`] is the production implementation on top of
//! `tokio-tungstenite`. Tests plug in their own connector.

use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::connection::ConnError;

/// Path segment the chat server exposes its raw WebSocket endpoint under.
const WEBSOCKET_SEGMENT: &str = "websocket";

/// WebSocket close code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Derive the WebSocket URL from the configured base URL.
///
/// - already ends with `/websocket` → unchanged
/// - ends with `/` → append `websocket`
/// - otherwise → append `/websocket`
pub fn websocket_url(base: &str) -> String {
    if base.ends_with("/websocket") {
        base.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, WEBSOCKET_SEGMENT)
    } else {
        format!("{}/{}", base, WEBSOCKET_SEGMENT)
    }
}

/// Something that happened on a transport session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The WebSocket handshake completed.
    Opened,
    /// A text message arrived.
    Text(String),
    /// A binary message arrived.
    Binary(Vec<u8>),
    /// The connection was closed (by either side).
    Closed { code: Option<u16>, reason: String },
    /// The connection failed (handshake error, I/O error, timeout).
    Failed(String),
}

/// Instructions from the driver to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    Text(String),
    Close { code: u16, reason: String },
}

/// Where a session reports its events. Each sink is stamped with the
/// session number it was created for so the driver can ignore events from
/// sessions it has already abandoned.
#[derive(Clone)]
pub struct EventSink {
    session: u64,
    tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
}

impl EventSink {
    pub(crate) fn new(session: u64, tx: mpsc::UnboundedSender<(u64, TransportEvent)>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    /// Report an event. Returns false once the driver has gone away.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.session, event)).is_ok()
    }
}

/// The driver's handle on one open (or opening) session.
pub struct TransportSession {
    outbound: mpsc::UnboundedSender<TransportCommand>,
    _cancel: Option<DropGuard>,
}

impl TransportSession {
    pub fn new(outbound: mpsc::UnboundedSender<TransportCommand>) -> Self {
        Self {
            outbound,
            _cancel: None,
        }
    }

    /// Like [`TransportSession::new`], but also cancels `token` when the
    /// handle is dropped.
    pub fn with_cancel(
        outbound: mpsc::UnboundedSender<TransportCommand>,
        token: CancellationToken,
    ) -> Self {
        Self {
            outbound,
            _cancel: Some(token.drop_guard()),
        }
    }

    /// Queue a text message. Returns false if the session has ended.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.outbound
            .send(TransportCommand::Text(text.into()))
            .is_ok()
    }

    /// Ask the session to close with the given code and reason.
    pub fn close(&self, code: u16, reason: impl Into<String>) {
        let _ = self.outbound.send(TransportCommand::Close {
            code,
            reason: reason.into(),
        });
    }
}

/// Opens transport sessions.
pub trait Connector: Send + Sync + 'static {
    /// Start opening a session to `url`. Must not block: progress is
    /// reported through `events`. Fails immediately only if no request can
    /// be built for `url`.
    fn open(&self, url: &str, events: EventSink) -> Result<TransportSession, ConnError>;
}

/// Knobs for [`WsConnector`].
#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    /// Sent as the `jwt-token` handshake header when present.
    pub auth_token: Option<String>,
}

/// `tokio-tungstenite` connector. Never retries on its own; retries are the
/// reconnection policy's job.
pub struct WsConnector {
    options: TransportOptions,
}

impl WsConnector {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    fn build_request(&self, url: &str) -> Result<Request, ConnError> {
        let mut request = url
            .into_client_request()
            .map_err(|e| ConnError::InvalidUrl(format!("{}: {}", url, e)))?;
        if let Some(token) = &self.options.auth_token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| ConnError::Transport(format!("invalid auth token header: {}", e)))?;
            request.headers_mut().insert("jwt-token", value);
        }
        Ok(request)
    }
}

impl Connector for WsConnector {
    fn open(&self, url: &str, events: EventSink) -> Result<TransportSession, ConnError> {
        let request = self.build_request(url)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        tokio::spawn(run_session(
            request,
            self.options.connect_timeout,
            rx,
            events,
            cancel.clone(),
        ));

        Ok(TransportSession::with_cancel(tx, cancel))
    }
}

async fn run_session(
    request: Request,
    connect_timeout: Duration,
    mut outbound: mpsc::UnboundedReceiver<TransportCommand>,
    events: EventSink,
    cancel: CancellationToken,
) {
    let connecting = tokio::time::timeout(connect_timeout, connect_async(request));
    let ws = tokio::select! {
        _ = cancel.cancelled() => return,
        result = connecting => match result {
            Ok(Ok((ws, _response))) => ws,
            Ok(Err(e)) => {
                events.emit(TransportEvent::Failed(e.to_string()));
                return;
            }
            Err(_) => {
                events.emit(TransportEvent::Failed(format!(
                    "connect timed out after {} ms",
                    connect_timeout.as_millis()
                )));
                return;
            }
        },
    };

    tracing::debug!(session = events.session(), "websocket open");
    events.emit(TransportEvent::Opened);
    let (mut sink, mut stream) = ws.split();

    loop {
        tokio::select! {
            // queued commands (a final Close in particular) go out before
            // cancellation is noticed
            biased;
            cmd = outbound.recv() => match cmd {
                Some(TransportCommand::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        events.emit(TransportEvent::Failed(e.to_string()));
                        break;
                    }
                }
                Some(TransportCommand::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.clone().into(),
                    };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    let _ = sink.close().await;
                    events.emit(TransportEvent::Closed { code: Some(code), reason });
                    break;
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },
            _ = cancel.cancelled() => {
                let _ = sink.close().await;
                break;
            }
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    events.emit(TransportEvent::Text(text));
                }
                Some(Ok(Message::Binary(data))) => {
                    events.emit(TransportEvent::Binary(data));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = match frame {
                        Some(f) => (Some(u16::from(f.code)), f.reason.into_owned()),
                        None => (None, String::new()),
                    };
                    events.emit(TransportEvent::Closed { code, reason });
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    events.emit(TransportEvent::Failed(e.to_string()));
                    break;
                }
                None => {
                    events.emit(TransportEvent::Closed {
                        code: None,
                        reason: "stream ended".to_string(),
                    });
                    break;
                }
            },
        }
    }
    tracing::debug!(session = events.session(), "websocket session finished");
}
