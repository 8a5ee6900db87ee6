use std::time::Duration;
use url::Url;

use crate::connection::ConnError;
use crate::heartbeat::Heartbeat;
use crate::reconnect::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RECONNECT_DELAY};
use crate::transport::{TransportOptions, websocket_url};

/// Default WebSocket connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything a [`StompClient`](crate::StompClient) needs to know up front.
///
/// The server URL is validated when the config is built, so a malformed
/// URL fails here rather than inside the connection driver. The remaining
/// fields use builder-style setters:
///
/// ```ignore
/// let config = ClientConfig::new("wss://chat.example.com/ws", 7, 3)?
///     .auth_token(token)
///     .heartbeat(Heartbeat::new(20_000, 20_000));
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    server_url: String,
    host: String,
    /// Sent as the CONNECT `login` header and in chat payloads.
    pub user_id: i64,
    pub branch_id: i64,
    /// Sent as `JWT-TOKEN` on the WebSocket handshake and in CONNECT.
    pub auth_token: Option<String>,
    /// Heartbeat intervals requested in CONNECT.
    pub heartbeat: Heartbeat,
    pub reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub connect_timeout: Duration,
    /// Subscribe to the DM queues and join the DM room after CONNECTED.
    pub auto_join: bool,
}

impl ClientConfig {
    /// Build a config for a `ws://` or `wss://` server URL.
    pub fn new(server_url: &str, user_id: i64, branch_id: i64) -> Result<Self, ConnError> {
        let parsed = Url::parse(server_url)
            .map_err(|e| ConnError::InvalidUrl(format!("{}: {}", server_url, e)))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(ConnError::InvalidUrl(format!(
                "{}: scheme must be ws or wss",
                server_url
            )));
        }
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(ConnError::InvalidUrl(format!(
                    "{}: missing host",
                    server_url
                )));
            }
        };

        Ok(Self {
            server_url: server_url.to_string(),
            host,
            user_id,
            branch_id,
            auth_token: None,
            heartbeat: Heartbeat::default(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_reconnect_attempts: DEFAULT_MAX_ATTEMPTS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            auto_join: true,
        })
    }

    /// Derive the chat endpoint `wss://<host>/ws` from the HTTP API base URL
    /// the rest of the app talks to.
    pub fn from_api_base(api_base: &str, user_id: i64, branch_id: i64) -> Result<Self, ConnError> {
        let parsed = Url::parse(api_base)
            .map_err(|e| ConnError::InvalidUrl(format!("{}: {}", api_base, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ConnError::InvalidUrl(format!("{}: missing host", api_base)))?;
        Self::new(&format!("wss://{}/ws", host), user_id, branch_id)
    }

    /// Set the JWT sent on the handshake and in CONNECT.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set the heartbeat intervals requested in CONNECT.
    ///
    /// Defaults to `10000,10000`; `Heartbeat::disabled()` turns both off.
    pub fn heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Set the fixed wait before each reconnect attempt (default 3s).
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set how many reconnects are tried after an unexpected loss
    /// (default 5). `0` disables reconnection.
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    /// Set how long the WebSocket handshake may take.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable the DM subscriptions and room join made after
    /// each CONNECTED (default on).
    pub fn auto_join(mut self, enabled: bool) -> Self {
        self.auto_join = enabled;
        self
    }

    /// The configured base URL, as given.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// `host[:port]` of the server URL, used as the CONNECT `host` header.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The URL the transport actually opens.
    pub fn websocket_url(&self) -> String {
        websocket_url(&self.server_url)
    }

    /// Options handed to [`WsConnector`](crate::transport::WsConnector).
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions {
            connect_timeout: self.connect_timeout,
            auth_token: self.auth_token.clone(),
        }
    }
}
