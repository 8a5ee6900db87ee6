//! Direct-message destinations and JSON payloads.

use serde::{Deserialize, Serialize};

/// Join/leave notifications for the current user.
pub const JOINED_DESTINATION: &str = "/user/queue/dm/joined";
/// Where the join request is sent after every CONNECTED.
pub const JOIN_DESTINATION: &str = "/app/dm/native/join";
/// Where outgoing direct messages are sent.
pub const SEND_DESTINATION: &str = "/app/dm/native/send";

/// The per-user queue on which incoming direct messages arrive.
pub fn user_messages_destination(user_id: i64) -> String {
    format!("/user/{}/queue/messages", user_id)
}

/// Body of the join request sent to [`JOIN_DESTINATION`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub user_id: i64,
    pub branch_id: i64,
}

/// Body of an outgoing direct message sent to [`SEND_DESTINATION`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmSendRequest {
    pub user_id: i64,
    pub branch_id: i64,
    pub content: String,
}

/// A direct message as delivered on the user's message queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub message_id: String,
    pub sender_id: i64,
    pub sender_type: String,
    pub sender_name: String,
    pub receiver_id: i64,
    pub receiver_type: String,
    pub receiver_name: String,
    pub branch_id: i64,
    pub branch_name: String,
    pub content: String,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub sent_at: String,
    pub room_id: String,
}

impl ChatMessage {
    /// True if `user_id` wrote this message.
    pub fn is_from(&self, user_id: i64) -> bool {
        self.sender_id == user_id
    }
}
