pub mod chat;
pub mod codec;
pub mod config;
pub mod connection;
pub mod frame;
pub mod heartbeat;
pub mod reconnect;
pub mod subscription;
pub mod transport;

pub use chat::ChatMessage;
pub use codec::StompItem;
pub use config::ClientConfig;
pub use connection::{
    ChatHandler, ClientStatus, ConnError, ConnectedHandler, ConnectionState, StompClient,
};
pub use frame::Frame;
pub use heartbeat::{Heartbeat, HeartbeatConfig, negotiate_heartbeats, parse_heartbeat_header};
pub use reconnect::{ReconnectState, ScheduleOutcome};
pub use transport::{Connector, EventSink, TransportEvent, TransportSession, websocket_url};
