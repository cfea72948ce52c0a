use serde::{Deserialize, Serialize};

/// One size of a photo. Telegram sends several sizes per photo, smallest first.
#[derive(Default, Debug, Clone, Deserialize, Serialize)]
pub struct PhotoSize {
    /// Identifier for this file, which can be used to download or reuse the file
    pub file_id: String,

    /// Photo width
    pub width: i64,

    /// Photo height
    pub height: i64,

    /// File size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
}
