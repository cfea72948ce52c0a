use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Deserialize, Serialize)]
pub struct User {
    /// Unique identifier for this user or bot
    pub id: i64,

    /// User's or bot's first name
    pub first_name: String,

    /// User's or bot's username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
