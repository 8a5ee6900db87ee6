use chrono::{DateTime, Local};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Maximum number of messages kept for the report
pub const MAX_MESSAGES: usize = 1000;

/// Statistics for a single destination
#[derive(Debug, Clone, Default)]
pub struct DestStats {
    /// Messages received on this destination
    pub received: u64,
}

/// A received message, kept for the report
#[derive(Debug, Clone)]
pub struct LoggedMessage {
    pub timestamp: DateTime<Local>,
    pub destination: String,
    pub body: String,
}

/// Session state shared between the command loop and client callbacks
pub struct AppState {
    pub start_time: DateTime<Local>,

    /// Connection info
    pub url: String,
    pub user_id: i64,

    /// Destination -> stats
    pub destinations: HashMap<String, DestStats>,

    /// Times the server answered CONNECTED (first connect plus reconnects)
    pub connect_count: u64,
    pub dm_sent: u64,

    pub messages: VecDeque<LoggedMessage>,
}

impl AppState {
    pub fn new(url: String, user_id: i64) -> Self {
        Self {
            start_time: Local::now(),
            url,
            user_id,
            destinations: HashMap::new(),
            connect_count: 0,
            dm_sent: 0,
            messages: VecDeque::with_capacity(MAX_MESSAGES),
        }
    }

    pub fn record_connected(&mut self) {
        self.connect_count += 1;
    }

    pub fn record_dm_sent(&mut self) {
        self.dm_sent += 1;
    }

    /// Record a received message
    pub fn record_message(&mut self, destination: &str, body: String) {
        self.destinations
            .entry(destination.to_string())
            .or_default()
            .received += 1;

        self.messages.push_back(LoggedMessage {
            timestamp: Local::now(),
            destination: destination.to_string(),
            body,
        });
        while self.messages.len() > MAX_MESSAGES {
            self.messages.pop_front();
        }
    }

    pub fn register_destination(&mut self, destination: &str) {
        self.destinations.entry(destination.to_string()).or_default();
    }

    pub fn total_received(&self) -> u64 {
        self.destinations.values().map(|s| s.received).sum()
    }

    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    pub fn generate_summary(&self) -> String {
        self.generate_summary_with_options(false, 80)
    }

    /// Session report, optionally with the message history
    pub fn generate_summary_with_options(&self, include_messages: bool, max_width: usize) -> String {
        let end_time = Local::now();
        let total_secs = end_time.signed_duration_since(self.start_time).num_seconds();
        let rule = "═".repeat(max_width.max(40) - 1);

        let mut lines = vec![
            rule.clone(),
            "  dm-chat Session Report".to_string(),
            rule.clone(),
            format!("  Server:     {}", self.url),
            format!("  User:       {}", self.user_id),
            format!("  Started:    {}", self.start_time.format("%Y-%m-%d %H:%M:%S")),
            format!("  Ended:      {}", end_time.format("%Y-%m-%d %H:%M:%S")),
            format!("  Duration:   {}m {}s", total_secs / 60, total_secs % 60),
            format!("  Connects:   {}", self.connect_count),
            format!("  DMs sent:   {}", self.dm_sent),
            String::new(),
            "  Destinations:".to_string(),
        ];

        let mut dests: Vec<_> = self.destinations.iter().collect();
        dests.sort_by(|a, b| b.1.received.cmp(&a.1.received).then(a.0.cmp(b.0)));

        let width = dests.iter().map(|(d, _)| d.len()).max().unwrap_or(20).min(40);
        for (dest, stats) in &dests {
            lines.push(format!(
                "    {:width$} {:>6}",
                truncate_str(dest, width),
                stats.received,
                width = width
            ));
        }
        lines.push(format!("    {:─>width$}", "", width = width + 7));
        lines.push(format!("    {:width$} {:>6}", "Total", self.total_received(), width = width));

        if include_messages && !self.messages.is_empty() {
            lines.push(String::new());
            lines.push("  Message History".to_string());
            for msg in &self.messages {
                let prefix = format!("  {} [{}] ", msg.timestamp.format("%H:%M:%S"), msg.destination);
                let body = truncate_str(&msg.body, max_width.saturating_sub(prefix.chars().count()));
                lines.push(format!("{}{}", prefix, body));
            }
        }

        lines.push(rule);
        lines.join("\n")
    }
}

/// Truncate to `max_len` characters, adding "..." if truncated
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        ".".repeat(max_len)
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

/// Thread-safe shared state. Client callbacks are synchronous, so this is a
/// std mutex that is never held across an await.
#[derive(Clone)]
pub struct SharedState(Arc<Mutex<AppState>>);

impl SharedState {
    pub fn new(url: String, user_id: i64) -> Self {
        Self(Arc::new(Mutex::new(AppState::new(url, user_id))))
    }

    pub fn lock(&self) -> MutexGuard<'_, AppState> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
