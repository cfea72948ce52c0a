//! The ingestion pipeline: one inbound attachment in, one stored file (or a
//! reason why not) out.
//!
//! The pipeline never talks to the chat. It returns a `Result` and the caller,
//! which owns the reply channel, turns that into text (see `bot`).

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Local, NaiveDateTime};

use crate::{
    api::{Document, PhotoSize},
    storage::{self, StoredFile},
    Config, IngestError,
};

/// Fetches the contents of an attachment from wherever it lives.
#[async_trait]
pub trait Download: Send + Sync {
    async fn download(&self, file_id: &str) -> anyhow::Result<Bytes>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttachmentKind {
    Photo,
    Document,
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentKind::Photo => f.write_str("image"),
            AttachmentKind::Document => f.write_str("document"),
        }
    }
}

/// A photo or document as announced by Telegram, before download.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub file_id: String,

    /// Filename declared by the sender. Photos never have one.
    pub file_name: Option<String>,

    /// MIME type declared by the sender. Photos never have one.
    pub mime_type: Option<String>,
}

impl Attachment {
    pub fn photo(file_id: impl Into<String>) -> Self {
        Self {
            kind: AttachmentKind::Photo,
            file_id: file_id.into(),
            file_name: None,
            mime_type: None,
        }
    }

    pub fn document(
        file_id: impl Into<String>,
        file_name: Option<String>,
        mime_type: Option<String>,
    ) -> Self {
        Self {
            kind: AttachmentKind::Document,
            file_id: file_id.into(),
            file_name,
            mime_type,
        }
    }

    /// True if the declared MIME type is an image type.
    pub fn has_image_type(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|mime| mime.starts_with("image/"))
    }
}

impl From<&PhotoSize> for Attachment {
    fn from(photo: &PhotoSize) -> Self {
        Attachment::photo(photo.file_id.clone())
    }
}

impl From<&Document> for Attachment {
    fn from(document: &Document) -> Self {
        Attachment::document(
            document.file_id.clone(),
            document.file_name.clone(),
            document.mime_type.clone(),
        )
    }
}

/// Reply for anything that is not an image.
pub const OTHER_MESSAGE: &str = "Please send me an image! I can save:\n\
    📷 Photos (compressed)\n\
    🖼 Image documents (uncompressed)\n\
    \n\
    Use /help for more info.";

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Stores authorized attachments in the configured save directory.
pub struct Ingest {
    config: Arc<Config>,

    /// Source of the timestamps used in file names.
    clock: Clock,
}

impl Ingest {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            clock: Box::new(|| Local::now().naive_local()),
        }
    }

    /// Replace the wall clock, e.g. to pin file names in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn authorize(&self, sender_id: i64) -> Result<(), IngestError> {
        if self.config.is_authorized(sender_id) {
            return Ok(());
        }

        warn!("Rejected attachment from unauthorized user {}", sender_id);
        Err(IngestError::Unauthorized(sender_id))
    }

    /// Stores a photo as `img_<timestamp>_<id prefix>.jpg`.
    pub async fn handle_photo(
        &self,
        source: &dyn Download,
        sender_id: i64,
        photo: &Attachment,
    ) -> Result<StoredFile, IngestError> {
        self.authorize(sender_id)?;

        let file_name = storage::photo_filename(&photo.file_id, &(self.clock)());
        self.store(source, photo, &file_name).await
    }

    /// Stores an image document under its own name with the timestamp
    /// inserted before the extension. Non-image documents are rejected
    /// without downloading anything.
    pub async fn handle_document(
        &self,
        source: &dyn Download,
        sender_id: i64,
        document: &Attachment,
    ) -> Result<StoredFile, IngestError> {
        self.authorize(sender_id)?;

        if !document.has_image_type() {
            debug!(
                "Rejected document {:?} with type {:?}",
                document.file_name, document.mime_type
            );
            return Err(IngestError::UnsupportedContentType(
                document.mime_type.clone(),
            ));
        }

        let file_name = storage::document_filename(document.file_name.as_deref(), &(self.clock)());
        self.store(source, document, &file_name).await
    }

    /// Anything else gets instructions. No authorization check, no disk access.
    pub fn handle_other(&self, sender_id: i64) -> &'static str {
        debug!("Non-image message from {}", sender_id);
        OTHER_MESSAGE
    }

    /// Creates the save directory if needed.
    pub async fn ensure_directory(&self) -> Result<(), IngestError> {
        let dir = self.config.save_path();
        storage::ensure_directory(dir)
            .await
            .map_err(|source| IngestError::DirectoryCreation {
                path: dir.to_path_buf(),
                source,
            })
    }

    async fn store(
        &self,
        source: &dyn Download,
        attachment: &Attachment,
        file_name: &str,
    ) -> Result<StoredFile, IngestError> {
        let result = self.download_and_write(source, attachment, file_name).await;

        match result {
            Ok(ref stored) => info!(
                "Saved {}: {} ({:.1} KB)",
                attachment.kind,
                stored.file_name,
                stored.size_kb()
            ),
            Err(ref err) => error!("Error saving {}: {}", attachment.kind, err),
        }

        result
    }

    async fn download_and_write(
        &self,
        source: &dyn Download,
        attachment: &Attachment,
        file_name: &str,
    ) -> Result<StoredFile, IngestError> {
        self.ensure_directory().await?;

        // Download fully before creating the file, so a failed download leaves
        // nothing behind.
        let contents = source
            .download(&attachment.file_id)
            .await
            .map_err(IngestError::Download)?;

        storage::write_new_file(self.config.save_path(), file_name, &contents).await
    }
}
