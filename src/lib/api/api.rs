use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Client;

/// Typed access to the handful of Bot API methods the bot uses. Requires a
/// `Client` initialized with a valid API token.
pub struct API {
    /// The underlying HTTP client.
    pub client: Client,
}

impl API {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

/// Marker for request bodies that can be posted to the Bot API.
pub trait Request: Serialize + Send + Sync {}

/// Errors reported by the Telegram API envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Telegram error: {0}")]
    AppError(String),

    #[error("No result")]
    NoResult,
}

/// Every Bot API response is wrapped in this envelope. If `ok` is `true`,
/// `result` is set; otherwise `description` explains the failure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

#[allow(clippy::should_implement_trait)]
impl<'de, T: Deserialize<'de>> ApiResponse<T> {
    pub fn from_str(data: &'de str) -> Result<Self> {
        let response: ApiResponse<T> = serde_json::from_str(data)?;
        Ok(response)
    }
}

impl<T> ApiResponse<T> {
    #[allow(non_snake_case)]
    pub fn Ok(result: T) -> Self {
        Self {
            ok: true,
            description: None,
            result: Some(result),
        }
    }

    #[allow(non_snake_case)]
    pub fn Err(description: impl Into<String>) -> Self {
        Self {
            ok: false,
            description: Some(description.into()),
            result: None,
        }
    }

    /// Unwraps the envelope into the result, or an `ApiError`.
    pub fn into_result(self) -> Result<T> {
        if !self.ok {
            return Err(ApiError::AppError(
                self.description
                    .unwrap_or_else(|| "No error description".to_string()),
            )
            .into());
        }

        self.result.ok_or_else(|| ApiError::NoResult.into())
    }
}
