use std::{io, path::PathBuf};

use thiserror::Error;

/// Why an attachment was not stored.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("unauthorized user: {0}")]
    Unauthorized(i64),

    #[error("unsupported content type: {}", .0.as_deref().unwrap_or("none"))]
    UnsupportedContentType(Option<String>),

    #[error("could not create {}: {source}", .path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download failed: {0:#}")]
    Download(anyhow::Error),

    #[error("could not write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
