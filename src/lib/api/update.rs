use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use super::{message::Message, user::User, Request, API};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Update {
    /// The update's unique identifier. Identifiers increase sequentially, so
    /// the next poll asks for everything after the highest one seen.
    pub update_id: i64,

    /// New incoming message of any kind: text, photo, document, etc.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
}

impl Update {
    pub fn message(&self) -> anyhow::Result<&Message> {
        self.message
            .as_ref()
            .ok_or(anyhow!("update is not a message"))
    }

    pub fn chat_id(&self) -> anyhow::Result<i64> {
        self.message().map(|msg| msg.chat.id)
    }

    pub fn from_user(&self) -> anyhow::Result<&User> {
        self.message()?
            .from
            .as_ref()
            .ok_or(anyhow!("message has no user"))
    }
}

/// Use this method to receive incoming updates using long polling.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct GetUpdatesRequest {
    /// Identifier of the first update to be returned. An update is confirmed
    /// as soon as getUpdates is called with an offset higher than its id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    /// Limits the number of updates to be retrieved. Defaults to 100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    /// Timeout in seconds for long polling.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,

    /// List the types of updates you want your bot to receive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<String>>,
}

impl Request for GetUpdatesRequest {}

impl GetUpdatesRequest {
    pub fn new() -> Self {
        Self {
            allowed_updates: Some(vec!["message".to_string()]),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: i64) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl API {
    /// Use this method to receive incoming updates using long polling. See
    /// [the official docs](https://core.telegram.org/bots/api#getupdates).
    pub async fn get_updates(&self, req: &GetUpdatesRequest) -> anyhow::Result<Vec<Update>> {
        self.client.post("getUpdates", req).await
    }
}
