use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Deserialize, Serialize)]
pub struct Chat {
    /// Unique identifier for this chat. Fits in 52 bits, so `i64` is safe.
    pub id: i64,

    /// Type of chat, can be either "private", "group", "supergroup" or "channel"
    #[serde(rename = "type")]
    pub chat_type: String,

    /// Username, for private chats, supergroups and channels if available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
