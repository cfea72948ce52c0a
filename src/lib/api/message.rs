use serde::{Deserialize, Serialize};

use super::{chat::Chat, document::Document, photo_size::PhotoSize, user::User, Request, API};

#[derive(Default, Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    /// Unique message identifier inside this chat
    pub message_id: i64,

    /// Sender, empty for messages sent to channels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,

    /// Date the message was sent in Unix time
    pub date: i64,

    /// Conversation the message belongs to
    pub chat: Chat,

    /// Message text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Available sizes of the photo, smallest first
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,

    /// General file attachment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,

    /// Caption for the photo or document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl Message {
    /// The largest available size of the photo in this message.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo.as_ref().and_then(|sizes| sizes.last())
    }
}

#[derive(Default, Debug, Serialize, Deserialize, Clone)]
pub struct SendMessageRequest {
    /// Unique identifier for the target chat
    pub chat_id: i64,

    /// Text of the message to be sent
    pub text: String,

    /// If the message is a reply, ID of the original message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
}

impl Request for SendMessageRequest {}

impl SendMessageRequest {
    pub fn new(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            ..Default::default()
        }
    }
}

impl API {
    pub async fn send_message(&self, req: &SendMessageRequest) -> anyhow::Result<Message> {
        self.client.post("sendMessage", req).await
    }
}
