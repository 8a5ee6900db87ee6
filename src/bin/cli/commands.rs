use chat_stomp::StompClient;
use std::io::Write;
use tokio::sync::mpsc;

use super::state::SharedState;

/// Result of executing a command
pub enum CommandResult {
    /// Command executed successfully
    Ok,
    /// Command requests exit
    Quit,
    /// Informational output
    Info(String),
    /// Error executing command
    Error(String),
}

/// Parse and execute a command
pub async fn execute_command(
    line: &str,
    client: &StompClient,
    state: &SharedState,
    sub_tx: &mpsc::UnboundedSender<String>,
) -> CommandResult {
    let parts: Vec<&str> = line.trim().splitn(3, ' ').collect();
    if parts.is_empty() || parts[0].is_empty() {
        return CommandResult::Ok;
    }

    match parts[0] {
        "quit" | "exit" | "q" => CommandResult::Quit,

        "dm" => {
            let content = line.trim().strip_prefix("dm").unwrap_or("").trim();
            if content.is_empty() {
                return CommandResult::Error("Usage: dm <message>".to_string());
            }
            if !client.is_connected() {
                return CommandResult::Error("Not connected".to_string());
            }
            client.send_dm_message(content);
            state.lock().record_dm_sent();
            CommandResult::Ok
        }

        "send" => {
            if parts.len() < 3 {
                return CommandResult::Error("Usage: send <destination> <message>".to_string());
            }
            if !client.is_connected() {
                return CommandResult::Error("Not connected".to_string());
            }
            client.send_message(
                parts[1],
                parts[2],
                vec![("content-type".to_string(), "text/plain".to_string())],
            );
            CommandResult::Ok
        }

        "json" => {
            if parts.len() < 3 {
                return CommandResult::Error("Usage: json <destination> <json>".to_string());
            }
            match serde_json::from_str::<serde_json::Value>(parts[2]) {
                Ok(value) => {
                    client.send_json(parts[1], &value, Vec::new());
                    CommandResult::Ok
                }
                Err(e) => CommandResult::Error(format!("Invalid JSON: {}", e)),
            }
        }

        "join" => {
            client.join_dm_room();
            CommandResult::Ok
        }

        "sub" | "subscribe" => {
            if parts.len() < 2 {
                return CommandResult::Error("Usage: sub <destination>".to_string());
            }
            if sub_tx.send(parts[1].to_string()).is_err() {
                return CommandResult::Error("Failed to request subscription".to_string());
            }
            CommandResult::Ok
        }

        "unsub" | "unsubscribe" => {
            if parts.len() < 2 {
                return CommandResult::Error("Usage: unsub <subscription-id>".to_string());
            }
            client.unsubscribe(parts[1]);
            CommandResult::Ok
        }

        "status" => match client.status().await {
            Some(status) => {
                let mut out = format!(
                    "State: {:?}\nReconnect: attempt {}/{}{}\nHeartbeat: send {} ms, expect {} ms",
                    status.state,
                    status.reconnect.attempt_count,
                    status.reconnect.max_attempts,
                    if status.reconnect.is_reconnecting { " (pending)" } else { "" },
                    status.heartbeat.client_interval_ms,
                    status.heartbeat.server_interval_ms,
                );
                for (id, dest) in &status.subscriptions {
                    out.push_str(&format!("\n  {} -> {}", id, dest));
                }
                CommandResult::Info(out)
            }
            None => CommandResult::Error("Client is not running".to_string()),
        },

        "summary" | "report" => {
            let text = {
                let state = state.lock();
                if parts[0] == "report" {
                    state.generate_summary_with_options(true, 80)
                } else {
                    state.generate_summary()
                }
            };
            match parts.get(1) {
                Some(filename) => match std::fs::File::create(filename) {
                    Ok(mut file) => match writeln!(file, "{}", text) {
                        Ok(()) => CommandResult::Info(format!("Written to {}", filename)),
                        Err(e) => CommandResult::Error(format!("Failed to write {}: {}", filename, e)),
                    },
                    Err(e) => CommandResult::Error(format!("Failed to create file: {}", e)),
                },
                None => CommandResult::Info(text),
            }
        }

        "clear" => {
            state.lock().clear_messages();
            CommandResult::Ok
        }

        "help" | "?" => {
            print_help();
            CommandResult::Ok
        }

        _ => CommandResult::Error(format!("Unknown command: {}. Type 'help' for commands.", parts[0])),
    }
}

/// Print help text
pub fn print_help() {
    println!("Commands:");
    println!("  dm <message>                  - Send a direct message to the branch");
    println!("  send <destination> <message>  - Send a plain-text message");
    println!("  json <destination> <json>     - Send a JSON payload");
    println!("  join                          - Re-send the DM room join request");
    println!("  sub <destination>             - Subscribe to a destination");
    println!("  unsub <subscription-id>       - Unsubscribe");
    println!("  status                        - Show connection status");
    println!("  summary [file]                - Print session summary (or save to file)");
    println!("  report [file]                 - Summary with message history (or save to file)");
    println!("  clear                         - Clear message history");
    println!("  quit                          - Exit");
}
