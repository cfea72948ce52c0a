use anyhow::Result;
use async_trait::async_trait;
use derive_more::*;
use serde::de::DeserializeOwned;

use crate::api::{ApiResponse, Request};

/// This is a wrapper around the Telegram API token string. Get your token from
/// [@BotFather](https://t.me/BotFather).
#[derive(Clone, From, Into, FromStr, Display)]
pub struct ApiToken(String);

// Keep the token out of logs.
impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

impl From<&str> for ApiToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Overrides the network side of the client. Tests install a fake server
/// through this hook.
#[async_trait]
pub trait Post {
    /// Handle a Bot API method call with a JSON body, returning the JSON response.
    async fn post(&self, method: String, req: String) -> Result<String>;

    /// Fetch the contents of a file previously resolved with `getFile`.
    async fn download(&self, file_path: String) -> Result<bytes::Bytes> {
        anyhow::bail!("download not supported: {}", file_path)
    }
}

/// This is a thin shim around the Telegram HTTP client.
pub struct Client {
    /// Base URL for method calls, derived from the token.
    base_url: String,

    /// Base URL for file downloads, derived from the token.
    file_url: String,

    client: reqwest::Client,

    /// Replaces the HTTP transport when set.
    post_handler: Option<Box<dyn Post + Send + Sync>>,
}

impl Client {
    pub fn new(token: impl Into<ApiToken>) -> Self {
        let token = token.into();
        Self {
            base_url: format!("https://api.telegram.org/bot{token}"),
            file_url: format!("https://api.telegram.org/file/bot{token}"),
            client: reqwest::Client::new(),
            post_handler: None,
        }
    }

    pub fn with_post_handler(mut self, post_handler: impl Post + Send + Sync + 'static) -> Self {
        self.post_handler = Some(Box::new(post_handler));
        self
    }

    /// Send `method` with `req` as the request body to the Telegram API.
    pub async fn post<Req, Resp>(&self, method: &str, req: &Req) -> Result<Resp>
    where
        Req: Request,
        Resp: DeserializeOwned,
    {
        let body = serde_json::to_string(req)?;
        debug!("POST /{}: {}", method, body);

        let response = if let Some(ref post_handler) = self.post_handler {
            post_handler.post(method.to_string(), body).await?
        } else {
            self.client
                .post(format!("{}/{}", self.base_url, method))
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body)
                .send()
                .await?
                .text()
                .await?
        };

        debug!("Response /{}: {}", method, response);
        ApiResponse::<Resp>::from_str(&response)?.into_result()
    }

    /// Download the file at `file_path` (as returned by `getFile`).
    pub async fn download_file(&self, file_path: &str) -> Result<bytes::Bytes> {
        debug!("Downloading file /{}", file_path);
        let body = if let Some(ref post_handler) = self.post_handler {
            post_handler.download(file_path.to_string()).await?
        } else {
            self.client
                .get(format!("{}/{}", self.file_url, file_path))
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?
        };
        debug!("Downloaded /{} ({} bytes)", file_path, body.len());
        Ok(body)
    }
}
