//! A fake Telegram API server. It answers the Bot API calls the bot makes, but
//! instead of talking to Telegram it delivers replies to [`FakeChat`] objects,
//! which tests use to play the part of a user.
use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};

use crate::{
    api::{
        self, BotCommand, Document, File, GetFileRequest, GetUpdatesRequest, Message, PhotoSize,
        SendMessageRequest, SetMyCommandsRequest, Update,
    },
    ApiResponse, Post,
};

/// Prefix of the `file_path` values handed out by `getFile`.
const FILE_PATH_PREFIX: &str = "files/";

fn random_file_id() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}

/// One user's private chat with the bot.
pub struct FakeChat {
    pub chat_id: i64,
    pub user_id: i64,
    pub username: String,
    api: Arc<FakeAPI>,
    chat_rx: Mutex<mpsc::Receiver<Message>>,
}

impl FakeChat {
    fn message(&self) -> Message {
        Message {
            message_id: rand::random::<u32>() as i64,
            from: Some(api::User {
                id: self.user_id,
                first_name: self.username.clone(),
                username: Some(self.username.clone()),
            }),
            date: Utc::now().timestamp(),
            chat: api::Chat {
                id: self.chat_id,
                chat_type: String::from("private"),
                username: Some(self.username.clone()),
            },
            ..Default::default()
        }
    }

    pub async fn send_text(&self, text: impl Into<String>) -> Result<()> {
        let mut message = self.message();
        message.text = Some(text.into());
        self.api.push_update(message).await
    }

    /// Sends a photo with `contents` as its largest size. Returns the file id
    /// of that size.
    pub async fn send_photo(&self, contents: impl Into<Bytes>) -> Result<String> {
        let file_id = random_file_id();
        self.send_photo_with_id(file_id.clone(), contents).await?;
        Ok(file_id)
    }

    pub async fn send_photo_with_id(
        &self,
        file_id: impl Into<String>,
        contents: impl Into<Bytes>,
    ) -> Result<()> {
        let file_id = file_id.into();
        let contents = contents.into();

        // Telegram always includes a small thumbnail first.
        let thumb_id = random_file_id();
        self.api.add_file(&thumb_id, Bytes::from_static(b"thumb")).await;
        self.api.add_file(&file_id, contents.clone()).await;

        let mut message = self.message();
        message.photo = Some(vec![
            PhotoSize {
                file_id: thumb_id,
                width: 90,
                height: 90,
                file_size: Some(5),
            },
            PhotoSize {
                file_id,
                width: 1280,
                height: 960,
                file_size: Some(contents.len() as i64),
            },
        ]);
        self.api.push_update(message).await
    }

    /// Sends a document. Returns its file id.
    pub async fn send_document(
        &self,
        file_name: Option<&str>,
        mime_type: Option<&str>,
        contents: impl Into<Bytes>,
    ) -> Result<String> {
        let file_id = random_file_id();
        let contents = contents.into();
        self.api.add_file(&file_id, contents.clone()).await;

        let mut message = self.message();
        message.document = Some(Document {
            file_id: file_id.clone(),
            file_name: file_name.map(String::from),
            mime_type: mime_type.map(String::from),
            file_size: Some(contents.len() as i64),
        });
        self.api.push_update(message).await?;
        Ok(file_id)
    }

    /// Waits for the next message the bot sends to this chat.
    pub async fn recv_message(&self) -> Option<Message> {
        self.chat_rx.lock().await.recv().await
    }

    /// Waits for the next message and returns its text.
    pub async fn recv_text(&self) -> Option<String> {
        self.recv_message().await.and_then(|message| message.text)
    }
}

pub struct FakeAPI {
    update_id: Mutex<i64>,
    updates_tx: mpsc::Sender<Message>,
    updates_rx: Mutex<mpsc::Receiver<Message>>,
    chats: Mutex<HashMap<i64, mpsc::Sender<Message>>>,
    files: Mutex<HashMap<String, Bytes>>,
    commands: Mutex<Vec<BotCommand>>,
}

impl Default for FakeAPI {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAPI {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(100);

        Self {
            update_id: Mutex::new(0),
            updates_tx: tx,
            updates_rx: Mutex::new(rx),
            chats: Mutex::new(HashMap::new()),
            files: Mutex::new(HashMap::new()),
            commands: Mutex::new(vec![]),
        }
    }

    async fn push_update(&self, message: Message) -> Result<()> {
        self.updates_tx
            .send(message)
            .await
            .map_err(|_| anyhow!("fake server is gone"))
    }

    /// Makes `contents` downloadable under `file_id`.
    pub async fn add_file(&self, file_id: &str, contents: Bytes) {
        self.files.lock().await.insert(file_id.to_string(), contents);
    }

    /// The commands most recently registered with `setMyCommands`.
    pub async fn commands(&self) -> Vec<BotCommand> {
        self.commands.lock().await.clone()
    }

    async fn get_updates(&self, req: GetUpdatesRequest) -> ApiResponse<Vec<Update>> {
        let mut rx = self.updates_rx.lock().await;

        tokio::select! {
            Some(message) = rx.recv() => {
                let update_id = {
                    let mut update_id = self.update_id.lock().await;
                    *update_id += 1;
                    *update_id
                };

                ApiResponse::Ok(vec![Update {
                    update_id,
                    message: Some(message),
                }])
            }
            _ = tokio::time::sleep(Duration::from_secs(req.timeout.unwrap_or(1) as u64)) => {
                ApiResponse::Ok(vec![])
            }
        }
    }

    async fn send_message(&self, req: SendMessageRequest) -> ApiResponse<Message> {
        let message = Message {
            message_id: rand::random::<u32>() as i64,
            from: Some(api::User {
                id: 0,
                first_name: "daguerre".to_string(),
                username: Some("daguerre_bot".to_string()),
            }),
            date: Utc::now().timestamp(),
            chat: api::Chat {
                id: req.chat_id,
                chat_type: String::from("private"),
                username: None,
            },
            text: Some(req.text),
            ..Default::default()
        };

        match self.chats.lock().await.get(&req.chat_id) {
            Some(chat) => {
                if chat.send(message.clone()).await.is_err() {
                    warn!("Chat {} is closed", req.chat_id);
                }
            }
            None => warn!("Can't find Chat with id = {}", req.chat_id),
        }

        ApiResponse::Ok(message)
    }

    async fn get_file(&self, req: GetFileRequest) -> ApiResponse<File> {
        match self.files.lock().await.get(&req.file_id) {
            Some(contents) => ApiResponse::Ok(File {
                file_id: req.file_id.clone(),
                file_size: Some(contents.len() as i64),
                file_path: Some(format!("{}{}", FILE_PATH_PREFIX, req.file_id)),
            }),
            None => ApiResponse::Err("Bad Request: invalid file_id"),
        }
    }

    async fn set_my_commands(&self, req: SetMyCommandsRequest) -> ApiResponse<bool> {
        *self.commands.lock().await = req.commands;
        ApiResponse::Ok(true)
    }
}

#[derive(Clone)]
pub struct FakeServer {
    pub api: Arc<FakeAPI>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self {
            api: Arc::new(FakeAPI::new()),
        }
    }

    /// Opens a private chat with the bot as the user `user_id`.
    pub async fn create_chat(&self, user_id: i64, username: impl Into<String>) -> FakeChat {
        let chat_id = rand::random::<u32>() as i64;
        let (tx, rx) = mpsc::channel(100);

        self.api.chats.lock().await.insert(chat_id, tx);

        FakeChat {
            chat_id,
            user_id,
            username: username.into(),
            api: Arc::clone(&self.api),
            chat_rx: Mutex::new(rx),
        }
    }
}

impl Default for FakeServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Post for FakeServer {
    async fn post(&self, method: String, req: String) -> Result<String> {
        use serde_json::to_string as json;

        debug!("method = {}, req = {}", method, req);
        let response = match method.as_str() {
            "getUpdates" => json(&self.api.get_updates(serde_json::from_str(&req)?).await),
            "sendMessage" => json(&self.api.send_message(serde_json::from_str(&req)?).await),
            "getFile" => json(&self.api.get_file(serde_json::from_str(&req)?).await),
            "setMyCommands" => json(&self.api.set_my_commands(serde_json::from_str(&req)?).await),
            _ => {
                warn!("Unknown method: {}", method);
                json(&ApiResponse::<()>::Err(format!("Unknown method: {}", method)))
            }
        };

        Ok(response?)
    }

    async fn download(&self, file_path: String) -> Result<Bytes> {
        let file_id = file_path
            .strip_prefix(FILE_PATH_PREFIX)
            .ok_or(anyhow!("Not found: {}", file_path))?;

        self.api
            .files
            .lock()
            .await
            .get(file_id)
            .cloned()
            .ok_or(anyhow!("Not found: {}", file_path))
    }
}
