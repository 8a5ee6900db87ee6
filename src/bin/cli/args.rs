use clap::Parser;

#[derive(Parser)]
#[command(name = "dm-chat")]
#[command(version)]
#[command(about = "Interactive direct-message chat client over STOMP/WebSocket")]
pub struct Cli {
    /// Chat server WebSocket URL (ws:// or wss://)
    #[arg(short, long, default_value = "ws://127.0.0.1:8080/ws")]
    pub url: String,

    /// Derive the server URL (wss://<host>/ws) from an HTTP API base URL instead
    #[arg(long, conflicts_with = "url")]
    pub api_base: Option<String>,

    /// User id (sent as the STOMP login and in chat payloads)
    #[arg(long)]
    pub user_id: i64,

    /// Branch id used in DM payloads
    #[arg(long)]
    pub branch_id: i64,

    /// Auth token sent as JWT-TOKEN
    #[arg(short, long)]
    pub token: Option<String>,

    /// Heartbeat settings (client-send,client-receive in ms)
    #[arg(long, default_value = "10000,10000")]
    pub heartbeat: String,

    /// Extra destinations to subscribe to after each connect (repeatable)
    #[arg(short, long)]
    pub subscribe: Vec<String>,

    /// Do not subscribe to the DM queues or join the DM room
    #[arg(long)]
    pub no_join: bool,

    /// Seconds to wait for the first CONNECTED before giving up
    #[arg(long, default_value_t = 15)]
    pub wait: u64,

    /// Default log filter when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Show session summary on exit
    #[arg(long)]
    pub summary: bool,
}
