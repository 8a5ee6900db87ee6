pub mod args;
pub mod commands;
pub mod plain;
pub mod state;

/// Exit codes for different error conditions
pub mod exit_codes {
    /// Successful execution
    pub const SUCCESS: u8 = 0;
    /// The server could not be reached before the connect deadline
    pub const NETWORK_ERROR: u8 = 1;
    /// Bad command line (e.g., malformed server URL)
    pub const CONFIG_ERROR: u8 = 2;
}
