use chat_stomp::{
    ChatHandler, ChatMessage, ClientConfig, ConnError, ConnectedHandler, ConnectionState,
    Heartbeat, StompClient, parse_heartbeat_header,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use super::args::Cli;
use super::commands::{CommandResult, execute_command, print_help};
use super::exit_codes;
use super::state::SharedState;

/// Run the interactive line-mode client
pub async fn run(cli: &Cli) -> Result<(), (String, u8)> {
    let config = build_config(cli).map_err(|e| format_config_error(&e))?;
    let url = config.websocket_url();
    println!("Connecting to {}...", url);

    let state = SharedState::new(url.clone(), config.user_id);
    let client = StompClient::new(config);
    client.initialize();

    // CONNECTED notifications; extra subscriptions are (re)made from the
    // command loop since callbacks cannot await
    let (connected_tx, mut connected_rx) = mpsc::unbounded_channel::<()>();
    let (sub_tx, mut sub_rx) = mpsc::unbounded_channel::<String>();

    let state_msg = state.clone();
    let on_message: ChatHandler = Arc::new(move |msg: ChatMessage| {
        let destination = format!("dm:{}", msg.room_id);
        println!("\n[{}] {}: {}", msg.sent_at, msg.sender_name, msg.content);
        state_msg.lock().record_message(&destination, msg.content);
        prompt();
    });
    let state_conn = state.clone();
    let on_connected: ConnectedHandler = Arc::new(move || {
        state_conn.lock().record_connected();
        let _ = connected_tx.send(());
    });
    client.connect(Some(on_message), Some(on_connected));

    wait_for_connection(&client, Duration::from_secs(cli.wait))
        .await
        .map_err(|()| {
            (
                format!("Could not connect to {} within {}s", url, cli.wait),
                exit_codes::NETWORK_ERROR,
            )
        })?;
    println!("Connected.");

    // Print state transitions after the first connect
    let mut changes = client.state_changes();
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let current = *changes.borrow_and_update();
            println!("\n[connection] {:?}", current);
            prompt();
        }
    });

    // Blocking stdin reader
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(l) => {
                    if cmd_tx.blocking_send(l).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    println!();
    print_help();
    println!();

    loop {
        prompt();
        tokio::select! {
            line = cmd_rx.recv() => {
                let Some(line) = line else { break };
                match execute_command(&line, &client, &state, &sub_tx).await {
                    CommandResult::Ok => {}
                    CommandResult::Quit => break,
                    CommandResult::Info(msg) => println!("{}", msg),
                    CommandResult::Error(msg) => eprintln!("{}", msg),
                }
            }
            Some(()) = connected_rx.recv() => {
                // the registry is cleared whenever a session ends
                for dest in &cli.subscribe {
                    subscribe_destination(&client, dest, &state).await;
                }
            }
            Some(dest) = sub_rx.recv() => {
                subscribe_destination(&client, &dest, &state).await;
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    println!("Disconnecting...");
    if cli.summary {
        println!("{}", state.lock().generate_summary());
    }
    client.cleanup().await;
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ClientConfig, ConnError> {
    let config = match &cli.api_base {
        Some(base) => ClientConfig::from_api_base(base, cli.user_id, cli.branch_id)?,
        None => ClientConfig::new(&cli.url, cli.user_id, cli.branch_id)?,
    };
    let (send_ms, receive_ms) = parse_heartbeat_header(&cli.heartbeat);
    let config = config
        .heartbeat(Heartbeat::new(send_ms, receive_ms))
        .auto_join(!cli.no_join);
    Ok(match &cli.token {
        Some(token) => config.auth_token(token.as_str()),
        None => config,
    })
}

async fn wait_for_connection(client: &StompClient, limit: Duration) -> Result<(), ()> {
    let mut changes = client.state_changes();
    let connected = changes.wait_for(|state| *state == ConnectionState::Connected);
    match tokio::time::timeout(limit, connected).await {
        Ok(Ok(_)) => Ok(()),
        _ => Err(()),
    }
}

/// Subscribe and print/record whatever arrives
async fn subscribe_destination(client: &StompClient, dest: &str, state: &SharedState) {
    let state_cb = state.clone();
    let dest_cb = dest.to_string();
    let handler = move |body: &str| {
        println!("\n[{}] {}", dest_cb, body);
        state_cb.lock().record_message(&dest_cb, body.to_string());
        prompt();
    };
    match client.subscribe(dest, handler).await {
        Some(id) => {
            println!("Subscribed to {} ({})", dest, id);
            state.lock().register_destination(dest);
        }
        None => eprintln!("Failed to subscribe to '{}': not connected", dest),
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Format a configuration error with user-friendly messaging
fn format_config_error(err: &ConnError) -> (String, u8) {
    match err {
        ConnError::InvalidUrl(msg) => (format!("Invalid server URL: {}", msg), exit_codes::CONFIG_ERROR),
        ConnError::Transport(msg) => (format!("Connection setup failed: {}", msg), exit_codes::NETWORK_ERROR),
    }
}
