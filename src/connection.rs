use futures::future;
use serde::Serialize;
use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::chat::{self, ChatMessage, DmSendRequest, JoinRequest};
use crate::codec::{self, StompItem};
use crate::config::ClientConfig;
use crate::frame::{Frame, command};
use crate::heartbeat::{HeartbeatConfig, HeartbeatController, tick};
use crate::reconnect::{ReconnectPolicy, ReconnectState};
use crate::subscription::{MessageHandler, SubscriptionRegistry};
use crate::transport::{
    Connector, EventSink, NORMAL_CLOSURE, TransportEvent, TransportSession, WsConnector,
};

/// STOMP versions offered in CONNECT.
pub const ACCEPT_VERSION: &str = "1.0,1.1,1.2";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Errors returned by client construction and transport setup.
///
/// Failures at runtime (lost connection, ERROR frames, wrong-state calls)
/// are logged rather than returned.
#[derive(Error, Debug)]
pub enum ConnError {
    /// The server URL could not be used
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// The transport could not be set up
    #[error("transport error: {0}")]
    Transport(String),
}

/// Lifecycle of the STOMP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

/// Callback for direct messages arriving on the user's queue.
pub type ChatHandler = Arc<dyn Fn(ChatMessage) + Send + Sync>;
/// Callback invoked after every CONNECTED frame.
pub type ConnectedHandler = Arc<dyn Fn() + Send + Sync>;

/// Point-in-time view of the driver's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientStatus {
    pub state: ConnectionState,
    pub reconnect: ReconnectState,
    pub heartbeat: HeartbeatConfig,
    /// `(id, destination)` pairs.
    pub subscriptions: Vec<(String, String)>,
}

enum Command {
    Connect {
        on_message: Option<ChatHandler>,
        on_connected: Option<ConnectedHandler>,
    },
    Subscribe {
        destination: String,
        handler: MessageHandler,
        reply: oneshot::Sender<Option<String>>,
    },
    Unsubscribe {
        id: String,
    },
    Send {
        destination: String,
        body: String,
        headers: Vec<(String, String)>,
    },
    Disconnect {
        done: oneshot::Sender<()>,
    },
    Cleanup {
        done: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<ClientStatus>,
    },
}

/// Handle to a STOMP-over-WebSocket chat connection.
///
/// Cloning is cheap; all clones drive the same connection. Every piece of
/// mutable state lives in a background driver task started by
/// [`StompClient::initialize`], and the methods here only send it
/// commands. Fire-and-forget methods return immediately; `subscribe`,
/// `disconnect`, `cleanup` and `status` wait for the driver to answer.
///
/// ```ignore
/// let client = StompClient::new(ClientConfig::new("wss://chat.example.com/ws", 7, 3)?);
/// client.initialize();
/// client.connect(Some(Arc::new(|msg| println!("{}", msg.content))), None);
/// ```
#[derive(Clone)]
pub struct StompClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    driver: Mutex<Option<mpsc::UnboundedSender<Command>>>,
    state: Arc<watch::Sender<ConnectionState>>,
}

impl StompClient {
    /// Client that connects over `tokio-tungstenite`.
    pub fn new(config: ClientConfig) -> Self {
        let connector = WsConnector::new(config.transport_options());
        Self::with_connector(config, Arc::new(connector))
    }

    /// Client that opens its transport sessions through `connector`.
    pub fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            inner: Arc::new(ClientInner {
                config,
                connector,
                driver: Mutex::new(None),
                state: Arc::new(state),
            }),
        }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Start the driver task on the current tokio runtime.
    ///
    /// Calling it again while initialized does nothing. Outside a runtime
    /// the error is logged and the client stays uninitialized.
    pub fn initialize(&self) {
        let mut driver = self.lock_driver();
        if driver.as_ref().is_some_and(|d| !d.is_closed()) {
            tracing::debug!("client already initialized");
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!(error = %e, "cannot initialize client outside a tokio runtime");
                return;
            }
        };

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let config = &self.inner.config;
        let task = Driver {
            config: config.clone(),
            connector: Arc::clone(&self.inner.connector),
            state: Arc::clone(&self.inner.state),
            events_tx,
            session: None,
            session_seq: 0,
            should_reconnect: false,
            heartbeat: HeartbeatController::new(config.heartbeat),
            reconnect: ReconnectPolicy::new(config.max_reconnect_attempts, config.reconnect_delay),
            registry: SubscriptionRegistry::new(),
            on_message: Arc::new(Mutex::new(None)),
            on_connected: None,
        };
        runtime.spawn(task.run(commands_rx, events_rx));
        *driver = Some(commands_tx);
        tracing::info!(url = %config.websocket_url(), "chat client initialized");
    }

    /// Whether a driver task is running for this client.
    pub fn is_initialized(&self) -> bool {
        self.lock_driver()
            .as_ref()
            .is_some_and(|driver| !driver.is_closed())
    }

    /// Open the connection if it is not already open or opening.
    ///
    /// The callbacks replace any given earlier. `on_message` receives
    /// direct messages from the user's queue; `on_connected` runs after
    /// each CONNECTED, including after a reconnect.
    pub fn connect(&self, on_message: Option<ChatHandler>, on_connected: Option<ConnectedHandler>) {
        if !self.is_initialized() {
            tracing::warn!("client not initialized; call initialize() before connect()");
            return;
        }
        self.command(Command::Connect {
            on_message,
            on_connected,
        });
    }

    /// Subscribe `handler` to `destination`.
    ///
    /// Returns the subscription id, or `None` if the client is not
    /// connected.
    pub async fn subscribe<F>(&self, destination: &str, handler: F) -> Option<String>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let sent = self.command(Command::Subscribe {
            destination: destination.to_string(),
            handler: Arc::new(handler),
            reply,
        });
        if !sent {
            tracing::error!(destination, "cannot subscribe: client not initialized");
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Send UNSUBSCRIBE for `id` and drop its handler.
    ///
    /// Parameters
    /// - `id`: the id returned by [`StompClient::subscribe`].
    ///
    /// Does nothing unless connected.
    pub fn unsubscribe(&self, id: &str) {
        self.command(Command::Unsubscribe { id: id.to_string() });
    }

    /// Send a SEND frame.
    ///
    /// Parameters
    /// - `destination`: STOMP destination, written as the first header.
    /// - `body`: frame body.
    /// - `headers`: extra headers, applied after `destination`; each
    ///   replaces any header of the same name.
    ///
    /// Dropped with an error log unless connected.
    pub fn send_message(&self, destination: &str, body: impl Into<String>, headers: Vec<(String, String)>) {
        self.command(Command::Send {
            destination: destination.to_string(),
            body: body.into(),
            headers,
        });
    }

    /// Serialize `payload` to JSON and send it with
    /// `content-type:application/json`.
    pub fn send_json<T: Serialize>(&self, destination: &str, payload: &T, headers: Vec<(String, String)>) {
        let Some(body) = json_body(destination, payload) else {
            return;
        };
        let mut all = vec![("content-type".to_string(), JSON_CONTENT_TYPE.to_string())];
        all.extend(headers);
        self.send_message(destination, body, all);
    }

    /// Announce this user in the DM room for their branch.
    pub fn join_dm_room(&self) {
        let config = &self.inner.config;
        self.send_json(
            chat::JOIN_DESTINATION,
            &JoinRequest {
                user_id: config.user_id,
                branch_id: config.branch_id,
            },
            Vec::new(),
        );
    }

    /// Send `content` as a direct message from this user.
    ///
    /// Parameters
    /// - `content`: message text; user and branch ids come from the config.
    pub fn send_dm_message(&self, content: &str) {
        let config = &self.inner.config;
        self.send_json(
            chat::SEND_DESTINATION,
            &DmSendRequest {
                user_id: config.user_id,
                branch_id: config.branch_id,
                content: content.to_string(),
            },
            Vec::new(),
        );
    }

    /// Close the connection and stop reconnecting. Returns once the driver
    /// has applied it; no timer fires afterwards.
    pub async fn disconnect(&self) {
        let (done, rx) = oneshot::channel();
        if self.command(Command::Disconnect { done }) {
            let _ = rx.await;
        }
    }

    /// Disconnect, drop the callbacks and stop the driver task. The client
    /// can be initialized again afterwards.
    pub async fn cleanup(&self) {
        let Some(driver) = self.lock_driver().take() else {
            tracing::debug!("cleanup on uninitialized client");
            return;
        };
        let (done, rx) = oneshot::channel();
        if driver.send(Command::Cleanup { done }).is_ok() {
            let _ = rx.await;
        }
        tracing::info!("chat client cleaned up");
    }

    /// Current connection state, as last published by the driver.
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Shorthand for `state() == ConnectionState::Connected`.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Receiver that observes the latest state.
    ///
    /// Only the most recent value is kept, so a short-lived state such as
    /// `Disconnecting` may never be seen.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the driver's state, or `None` when not initialized.
    pub async fn status(&self) -> Option<ClientStatus> {
        let (reply, rx) = oneshot::channel();
        if !self.command(Command::Status { reply }) {
            return None;
        }
        rx.await.ok()
    }

    fn command(&self, cmd: Command) -> bool {
        match self.lock_driver().as_ref() {
            Some(driver) => driver.send(cmd).is_ok(),
            None => false,
        }
    }

    fn lock_driver(&self) -> MutexGuard<'_, Option<mpsc::UnboundedSender<Command>>> {
        self.inner
            .driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn json_body<T: Serialize>(destination: &str, payload: &T) -> Option<String> {
    match serde_json::to_string(payload) {
        Ok(body) => Some(body),
        Err(e) => {
            tracing::error!(destination, error = %e, "failed to serialize JSON payload");
            None
        }
    }
}

fn deliver_chat_message(slot: &Mutex<Option<ChatHandler>>, body: &str) {
    let message = match serde_json::from_str::<ChatMessage>(body) {
        Ok(message) => message,
        Err(e) => {
            tracing::error!(error = %e, body, "failed to parse chat message");
            return;
        }
    };
    tracing::debug!(message_id = %message.message_id, sender = message.sender_id, "chat message received");
    let handler = slot
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone();
    if let Some(handler) = handler {
        handler(message);
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => future::pending().await,
    }
}

/// Leaves the shared state at `Disconnected` when the driver exits,
/// including by unwinding.
struct PublishDisconnected(Arc<watch::Sender<ConnectionState>>);

impl Drop for PublishDisconnected {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            let changed = *state != ConnectionState::Disconnected;
            *state = ConnectionState::Disconnected;
            changed
        });
    }
}

enum Step {
    Command(Option<Command>),
    Transport(u64, TransportEvent),
    HeartbeatDue,
    LivenessCheck,
    ReconnectDue,
}

struct Driver {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    state: Arc<watch::Sender<ConnectionState>>,
    events_tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
    session: Option<TransportSession>,
    session_seq: u64,
    should_reconnect: bool,
    heartbeat: HeartbeatController,
    reconnect: ReconnectPolicy,
    registry: SubscriptionRegistry,
    on_message: Arc<Mutex<Option<ChatHandler>>>,
    on_connected: Option<ConnectedHandler>,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<(u64, TransportEvent)>,
    ) {
        let _published = PublishDisconnected(Arc::clone(&self.state));
        loop {
            let step = tokio::select! {
                cmd = commands.recv() => Step::Command(cmd),
                Some((session, event)) = events.recv() => Step::Transport(session, event),
                _ = tick(&mut self.heartbeat.send_timer) => Step::HeartbeatDue,
                _ = tick(&mut self.heartbeat.liveness_timer) => Step::LivenessCheck,
                _ = wait_until(self.reconnect.deadline()) => Step::ReconnectDue,
            };

            match step {
                Step::Command(Some(cmd)) => {
                    if self.handle_command(cmd).is_break() {
                        break;
                    }
                }
                Step::Command(None) => {
                    // every handle is gone
                    self.shutdown();
                    break;
                }
                Step::Transport(session, event) => self.handle_transport_event(session, event),
                Step::HeartbeatDue => self.send_heartbeat(),
                Step::LivenessCheck => self.check_liveness(),
                Step::ReconnectDue => self.fire_reconnect(),
            }
        }
        tracing::debug!("connection driver stopped");
    }

    fn handle_command(&mut self, cmd: Command) -> ControlFlow<()> {
        match cmd {
            Command::Connect {
                on_message,
                on_connected,
            } => self.connect(on_message, on_connected),
            Command::Subscribe {
                destination,
                handler,
                reply,
            } => {
                let _ = reply.send(self.subscribe(&destination, handler));
            }
            Command::Unsubscribe { id } => self.unsubscribe(&id),
            Command::Send {
                destination,
                body,
                headers,
            } => self.send_message(&destination, body, headers),
            Command::Disconnect { done } => {
                self.disconnect();
                let _ = done.send(());
            }
            Command::Cleanup { done } => {
                self.shutdown();
                let _ = done.send(());
                return ControlFlow::Break(());
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
        ControlFlow::Continue(())
    }

    fn current_state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
        if changed {
            tracing::debug!(state = ?next, "connection state changed");
        }
    }

    fn connect(&mut self, on_message: Option<ChatHandler>, on_connected: Option<ConnectedHandler>) {
        *self
            .on_message
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = on_message;
        self.on_connected = on_connected;

        match self.current_state() {
            ConnectionState::Connecting | ConnectionState::Connected => {
                tracing::debug!("already connected or connecting");
            }
            _ => {
                self.should_reconnect = true;
                self.reconnect.cancel();
                self.open_session();
            }
        }
    }

    fn open_session(&mut self) {
        self.set_state(ConnectionState::Connecting);
        self.session_seq += 1;
        let url = self.config.websocket_url();
        let sink = EventSink::new(self.session_seq, self.events_tx.clone());

        match self.connector.open(&url, sink) {
            Ok(session) => {
                tracing::info!(url = %url, session = self.session_seq, "opening websocket");
                self.session = Some(session);
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "websocket connection failed");
                self.session = None;
                self.set_state(ConnectionState::Disconnected);
                if self.should_reconnect {
                    self.reconnect.schedule(Instant::now());
                }
            }
        }
    }

    fn handle_transport_event(&mut self, session: u64, event: TransportEvent) {
        if session != self.session_seq || self.session.is_none() {
            tracing::trace!(session, "ignoring event from stale session");
            return;
        }
        match event {
            TransportEvent::Opened => self.send_connect_frame(),
            TransportEvent::Text(text) => self.handle_text(&text),
            TransportEvent::Binary(data) => {
                tracing::debug!(bytes = data.len(), "discarding binary websocket message");
            }
            TransportEvent::Closed { code, reason } => {
                tracing::info!(?code, reason = %reason, "websocket closed");
                self.lose_session(None);
            }
            TransportEvent::Failed(err) => {
                tracing::error!(error = %err, "websocket failure");
                self.lose_session(None);
            }
        }
    }

    fn send_connect_frame(&mut self) {
        let requested = self.heartbeat.requested();
        let mut frame = Frame::new(command::CONNECT)
            .header("accept-version", ACCEPT_VERSION)
            .header("heart-beat", requested.to_string())
            .header("host", self.config.host())
            .header("login", self.config.user_id.to_string());
        if let Some(token) = &self.config.auth_token {
            frame.set_header("JWT-TOKEN", token.as_str());
        }
        if self.send_frame(&frame) {
            tracing::debug!(heartbeat = %requested, "STOMP CONNECT sent");
        }
    }

    fn handle_text(&mut self, text: &str) {
        self.heartbeat.record_beat(Instant::now());
        match codec::decode_item(text) {
            Some(StompItem::Heartbeat) => tracing::trace!("server heartbeat"),
            Some(StompItem::Frame(frame)) => self.handle_frame(frame),
            None => {}
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        match frame.command.as_str() {
            command::CONNECTED => self.on_connected_frame(&frame),
            command::MESSAGE => self.on_message_frame(&frame),
            command::ERROR => {
                tracing::error!(
                    error_message = frame.get_header("message").unwrap_or("unknown error"),
                    body = %frame.body,
                    "STOMP error"
                );
                self.lose_session(Some("STOMP error"));
            }
            command::RECEIPT => {
                tracing::debug!(
                    receipt = frame.get_header("receipt-id").unwrap_or("unknown"),
                    "STOMP receipt"
                );
            }
            other => tracing::debug!(command = other, "ignoring unhandled STOMP frame"),
        }
    }

    fn on_connected_frame(&mut self, frame: &Frame) {
        self.set_state(ConnectionState::Connected);
        self.reconnect.on_connected();
        tracing::info!(
            version = frame.get_header("version").unwrap_or("unknown"),
            "STOMP connected"
        );

        self.heartbeat.negotiate(frame.get_header("heart-beat"));
        self.heartbeat.start(Instant::now());

        if self.config.auto_join {
            self.subscribe(
                chat::JOINED_DESTINATION,
                Arc::new(|body: &str| tracing::debug!(body, "DM room joined")),
            );
            let slot = Arc::clone(&self.on_message);
            self.subscribe(
                &chat::user_messages_destination(self.config.user_id),
                Arc::new(move |body: &str| deliver_chat_message(&slot, body)),
            );
            let join = JoinRequest {
                user_id: self.config.user_id,
                branch_id: self.config.branch_id,
            };
            if let Some(body) = json_body(chat::JOIN_DESTINATION, &join) {
                self.send_message(
                    chat::JOIN_DESTINATION,
                    body,
                    vec![("content-type".to_string(), JSON_CONTENT_TYPE.to_string())],
                );
            }
        }

        if let Some(on_connected) = &self.on_connected {
            if panic::catch_unwind(AssertUnwindSafe(|| on_connected())).is_err() {
                tracing::error!("on_connected callback panicked");
            }
        }
    }

    fn on_message_frame(&mut self, frame: &Frame) {
        let Some(id) = frame.get_header("subscription") else {
            tracing::warn!("MESSAGE without subscription header dropped");
            return;
        };
        tracing::debug!(
            subscription = id,
            destination = frame.get_header("destination").unwrap_or("unknown"),
            "STOMP message"
        );
        if !self.registry.dispatch(id, &frame.body) {
            tracing::debug!(subscription = id, "no handler for subscription; message dropped");
        }
    }

    fn subscribe(&mut self, destination: &str, handler: MessageHandler) -> Option<String> {
        if self.current_state() != ConnectionState::Connected {
            tracing::error!(destination, "cannot subscribe: not connected");
            return None;
        }
        let id = self.registry.add(destination, handler);
        let frame = Frame::new(command::SUBSCRIBE)
            .header("id", id.as_str())
            .header("destination", destination);
        self.send_frame(&frame);
        tracing::debug!(destination, id = %id, "subscribed");
        Some(id)
    }

    fn unsubscribe(&mut self, id: &str) {
        if self.current_state() != ConnectionState::Connected {
            tracing::warn!(id, "cannot unsubscribe: not connected");
            return;
        }
        self.send_frame(&Frame::new(command::UNSUBSCRIBE).header("id", id));
        if !self.registry.remove(id) {
            tracing::debug!(id, "unsubscribed unknown subscription id");
        }
    }

    fn send_message(&mut self, destination: &str, body: String, headers: Vec<(String, String)>) {
        if self.current_state() != ConnectionState::Connected {
            tracing::error!(destination, "cannot send message: not connected");
            return;
        }
        let mut frame = Frame::new(command::SEND)
            .header("destination", destination)
            .set_body(body);
        for (key, value) in headers {
            frame.set_header(key, value);
        }
        if self.send_frame(&frame) {
            tracing::debug!(destination, "message sent");
        }
    }

    fn send_frame(&self, frame: &Frame) -> bool {
        let sent = self
            .session
            .as_ref()
            .is_some_and(|session| session.send_text(codec::encode_frame(frame)));
        if !sent {
            tracing::warn!(command = %frame.command, "no open session; frame not sent");
        }
        sent
    }

    fn send_heartbeat(&mut self) {
        if self.current_state() != ConnectionState::Connected {
            self.heartbeat.stop();
            return;
        }
        match &self.session {
            Some(session) if session.send_text(codec::HEARTBEAT) => {
                tracing::trace!("client heartbeat sent");
            }
            _ => {
                tracing::warn!("heartbeat send failed; stopping heartbeat");
                self.heartbeat.stop();
            }
        }
    }

    fn check_liveness(&mut self) {
        let now = Instant::now();
        if self.current_state() != ConnectionState::Connected || !self.heartbeat.is_timed_out(now) {
            return;
        }
        let silent_ms = self
            .heartbeat
            .config()
            .last_server_beat_at
            .map_or(0, |last| now.saturating_duration_since(last).as_millis() as u64);
        tracing::warn!(silent_ms, "server heartbeat timeout; closing connection");
        self.lose_session(Some("heartbeat timeout"));
    }

    /// The session ended without the user asking for it. `close_reason`
    /// is set when this side is the one ending it.
    fn lose_session(&mut self, close_reason: Option<&str>) {
        let user_initiated = self.current_state() == ConnectionState::Disconnecting;
        self.heartbeat.reset();
        self.registry.clear();
        if let Some(session) = self.session.take() {
            if let Some(reason) = close_reason {
                session.close(NORMAL_CLOSURE, reason);
            }
        }
        self.set_state(ConnectionState::Disconnected);

        if !user_initiated && self.should_reconnect {
            self.reconnect.schedule(Instant::now());
        } else {
            tracing::debug!("connection closed; not reconnecting");
        }
    }

    fn fire_reconnect(&mut self) {
        self.reconnect.fire();
        if self.should_reconnect && self.current_state() == ConnectionState::Disconnected {
            let state = self.reconnect.state();
            tracing::info!(
                attempt = state.attempt_count,
                max = state.max_attempts,
                "attempting reconnect"
            );
            self.open_session();
        } else {
            tracing::debug!("reconnect no longer needed; attempt abandoned");
        }
    }

    fn disconnect(&mut self) {
        tracing::debug!("disconnect requested");
        self.should_reconnect = false;
        self.reconnect.cancel();
        self.heartbeat.reset();

        let was_connected = self.current_state() == ConnectionState::Connected;
        self.set_state(ConnectionState::Disconnecting);
        if let Some(session) = self.session.take() {
            if was_connected
                && session.send_text(codec::encode_frame(&Frame::new(command::DISCONNECT)))
            {
                tracing::debug!("STOMP DISCONNECT sent");
            }
            session.close(NORMAL_CLOSURE, "User disconnected");
        }
        self.set_state(ConnectionState::Disconnected);
        self.registry.clear();
        tracing::info!("disconnected");
    }

    fn shutdown(&mut self) {
        self.should_reconnect = false;
        self.disconnect();
        self.on_connected = None;
        *self
            .on_message
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    fn status(&self) -> ClientStatus {
        ClientStatus {
            state: self.current_state(),
            reconnect: self.reconnect.state(),
            heartbeat: self.heartbeat.config(),
            subscriptions: self.registry.entries(),
        }
    }
}
