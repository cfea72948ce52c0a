//! Everything that touches the save directory: naming, writing, counting and
//! free-space queries.

use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use tokio::{
    fs,
    io::{AsyncRead, AsyncWriteExt},
};

use crate::IngestError;

/// Extensions counted as images by `/status`.
pub const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".png", ".gif", ".webp"];

/// Second resolution, e.g. `20240301_101530`.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Telegram re-encodes compressed photos as JPEG.
pub const PHOTO_EXTENSION: &str = "jpg";

/// Name used for documents sent without a filename.
pub const DEFAULT_DOCUMENT_NAME: &str = "image";

/// How many `_N` suffixes to try before giving up on a name.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// A file written to the save directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub file_name: String,
    pub path: PathBuf,

    /// Size on disk, in bytes.
    pub size: u64,
}

impl StoredFile {
    pub fn size_kb(&self) -> f64 {
        self.size as f64 / 1024.0
    }
}

/// Creates `path` and any missing parents. Does nothing if it already exists.
pub async fn ensure_directory(path: &Path) -> io::Result<()> {
    match fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        _ => {
            fs::create_dir_all(path).await?;
            info!("Created directory: {}", path.display());
            Ok(())
        }
    }
}

/// `img_<timestamp>_<first 8 chars of file id>.jpg`
pub fn photo_filename(file_id: &str, timestamp: &NaiveDateTime) -> String {
    let prefix: String = file_id.chars().take(8).collect();
    format!(
        "img_{}_{}.{}",
        timestamp.format(TIMESTAMP_FORMAT),
        prefix,
        PHOTO_EXTENSION
    )
}

/// Inserts the timestamp before the extension of the sender's filename
/// (`name_<timestamp>.ext`), or appends it when there is no extension.
pub fn document_filename(file_name: Option<&str>, timestamp: &NaiveDateTime) -> String {
    let file_name = sanitize(file_name.unwrap_or(DEFAULT_DOCUMENT_NAME));
    let timestamp = timestamp.format(TIMESTAMP_FORMAT);

    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}_{}.{}", stem, timestamp, ext),
        None => format!("{}_{}", file_name, timestamp),
    }
}

/// Senders control document names, so strip anything that could leave the
/// save directory.
fn sanitize(file_name: &str) -> String {
    let name = file_name.replace(['/', '\\', '\0'], "_");
    if name.is_empty() || name == "." || name == ".." {
        return DEFAULT_DOCUMENT_NAME.to_string();
    }
    name
}

/// `name.ext` becomes `name_<n>.ext`.
fn with_suffix(file_name: &str, n: usize) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{}_{}.{}", stem, n, ext),
        None => format!("{}_{}", file_name, n),
    }
}

/// Atomically claims a name in `dir`, starting with `file_name` and adding a
/// numeric suffix while the name is taken.
async fn create_unique(dir: &Path, file_name: &str) -> io::Result<(String, PathBuf, fs::File)> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = match attempt {
            0 => file_name.to_string(),
            n => with_suffix(file_name, n),
        };
        let path = dir.join(&candidate);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((candidate, path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{} already exists, trying another name", path.display());
            }
            Err(err) => return Err(err),
        }
    }

    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free name for {}", file_name),
    ))
}

/// Writes `contents` to a new file in `dir` named after `file_name`, never
/// overwriting an existing file. A partially written file is removed.
pub async fn write_new_file(
    dir: &Path,
    file_name: &str,
    contents: &[u8],
) -> Result<StoredFile, IngestError> {
    let mut contents = contents;
    copy_to_new_file(dir, file_name, &mut contents).await
}

/// Like `write_new_file`, but streams from `reader`. If reading or writing
/// fails partway, the new file is removed.
pub async fn copy_to_new_file<R>(
    dir: &Path,
    file_name: &str,
    reader: &mut R,
) -> Result<StoredFile, IngestError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let (file_name, path, mut file) = create_unique(dir, file_name).await.map_err(|source| {
        IngestError::Write {
            path: dir.join(file_name),
            source,
        }
    })?;

    let written = async {
        tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        drop(file);
        fs::metadata(&path).await
    }
    .await;

    match written {
        Ok(metadata) => Ok(StoredFile {
            file_name,
            path,
            size: metadata.len(),
        }),
        Err(source) => {
            if let Err(err) = fs::remove_file(&path).await {
                warn!("Could not remove partial file {}: {}", path.display(), err);
            }
            Err(IngestError::Write { path, source })
        }
    }
}

/// Returns true if `file_name` has one of the `IMAGE_EXTENSIONS`, ignoring case.
pub fn is_image_name(file_name: &str) -> bool {
    let file_name = file_name.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| file_name.ends_with(ext))
}

/// Counts the image files in `dir`.
pub async fn count_images(dir: &Path) -> io::Result<usize> {
    let mut entries = fs::read_dir(dir).await?;
    let mut count = 0;

    while let Some(entry) = entries.next_entry().await? {
        if is_image_name(&entry.file_name().to_string_lossy()) {
            count += 1;
        }
    }

    Ok(count)
}

/// Bytes available to unprivileged users on the filesystem holding `path`,
/// or `None` if it cannot be queried.
#[cfg(unix)]
#[allow(clippy::unnecessary_cast)]
pub fn free_space(path: &Path) -> Option<u64> {
    use nix::sys::statvfs::statvfs;

    match statvfs(path) {
        Ok(stat) => Some(stat.blocks_available() as u64 * stat.fragment_size() as u64),
        Err(err) => {
            debug!("statvfs({}) failed: {}", path.display(), err);
            None
        }
    }
}

#[cfg(not(unix))]
pub fn free_space(_path: &Path) -> Option<u64> {
    None
}

/// `free_space` in megabytes.
pub fn free_space_mb(path: &Path) -> Option<f64> {
    free_space(path).map(|bytes| bytes as f64 / (1024.0 * 1024.0))
}
