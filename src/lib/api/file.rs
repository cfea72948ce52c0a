use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Request, API};
use crate::ingest::Download;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct File {
    /// Identifier for this file, which can be used to download or reuse the file
    pub file_id: String,

    /// File size
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,

    /// Path to pass to `Client::download_file`. Valid for at least an hour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GetFileRequest {
    /// Unique identifier for target file
    pub file_id: String,
}

impl Request for GetFileRequest {}

impl GetFileRequest {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
        }
    }
}

impl API {
    pub async fn get_file(&self, req: &GetFileRequest) -> anyhow::Result<File> {
        self.client.post("getFile", req).await
    }
}

/// Resolve the file id with `getFile`, then fetch its contents.
#[async_trait]
impl Download for API {
    async fn download(&self, file_id: &str) -> anyhow::Result<bytes::Bytes> {
        let file = self.get_file(&GetFileRequest::new(file_id)).await?;
        let file_path = file
            .file_path
            .ok_or(anyhow!("Telegram returned no path for file {}", file_id))?;
        self.client.download_file(&file_path).await
    }
}
