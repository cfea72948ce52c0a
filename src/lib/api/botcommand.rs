use serde::{Deserialize, Serialize};

use super::{Request, API};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotCommand {
    /// Text of the command, 1-32 characters. Can contain only lowercase English
    /// letters, digits and underscores.
    pub command: String,

    /// Description of the command, 3-256 characters.
    pub description: String,
}

impl BotCommand {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            description: description.into(),
        }
    }
}

#[derive(Default, Debug, Serialize, Deserialize, Clone)]
pub struct SetMyCommandsRequest {
    /// At most 100 commands can be specified.
    pub commands: Vec<BotCommand>,

    /// A two-letter ISO 639-1 language code. If empty, commands apply to all
    /// users without dedicated commands for their language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

impl Request for SetMyCommandsRequest {}

impl SetMyCommandsRequest {
    pub fn new(commands: Vec<BotCommand>) -> Self {
        Self {
            commands,
            ..Default::default()
        }
    }
}

impl API {
    pub async fn set_my_commands(&self, req: &SetMyCommandsRequest) -> anyhow::Result<bool> {
        self.client.post("setMyCommands", req).await
    }
}
