use std::{
    io,
    path::Path,
    pin::Pin,
    task::{Context, Poll},
};

use chrono::{NaiveDate, NaiveDateTime};
use daguerre::{storage::*, IngestError};
use tokio::io::{AsyncRead, ReadBuf};

fn fixed_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(10, 15, 30)
        .unwrap()
}

#[test]
fn photo_names() {
    let ts = fixed_time();
    assert_eq!(
        photo_filename("abcdef1234567890", &ts),
        "img_20240301_101530_abcdef12.jpg"
    );

    // Short ids are used whole.
    assert_eq!(photo_filename("abc", &ts), "img_20240301_101530_abc.jpg");
}

#[test]
fn document_names() {
    let ts = fixed_time();
    assert_eq!(
        document_filename(Some("diagram.png"), &ts),
        "diagram_20240301_101530.png"
    );
    assert_eq!(
        document_filename(Some("archive.tar.gz"), &ts),
        "archive.tar_20240301_101530.gz"
    );
    assert_eq!(document_filename(Some("scan"), &ts), "scan_20240301_101530");
    assert_eq!(document_filename(None, &ts), "image_20240301_101530");
}

#[test]
fn document_names_stay_in_the_save_directory() {
    let ts = fixed_time();
    assert_eq!(
        document_filename(Some("../../etc/cron.d/x.png"), &ts),
        ".._.._etc_cron.d_x_20240301_101530.png"
    );
    assert_eq!(
        document_filename(Some("..\\evil.png"), &ts),
        ".._evil_20240301_101530.png"
    );
    assert_eq!(document_filename(Some(".."), &ts), "image_20240301_101530");
    assert_eq!(document_filename(Some(""), &ts), "image_20240301_101530");
}

#[test]
fn image_names() {
    assert!(is_image_name("a.jpg"));
    assert!(is_image_name("B.JPEG"));
    assert!(is_image_name("c.Png"));
    assert!(is_image_name("d.gif"));
    assert!(is_image_name("e.webp"));
    assert!(!is_image_name("f.pdf"));
    assert!(!is_image_name("jpg"));
    assert!(!is_image_name("scan_20240301_101530"));
}

#[tokio::test]
async fn counts_only_images() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["a.jpg", "b.PNG", "c.webp", "notes.txt", "scan_20240301_101530"] {
        std::fs::write(dir.path().join(name), b"x").unwrap();
    }

    assert_eq!(count_images(dir.path()).await.unwrap(), 3);
}

#[tokio::test]
async fn count_images_fails_for_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    assert!(count_images(&dir.path().join("missing")).await.is_err());
}

#[tokio::test]
async fn writes_new_files_without_overwriting() {
    let dir = tempfile::tempdir().unwrap();

    let first = write_new_file(dir.path(), "shot.png", b"one").await.unwrap();
    let second = write_new_file(dir.path(), "shot.png", b"two!").await.unwrap();
    let third = write_new_file(dir.path(), "shot", b"3").await.unwrap();
    let fourth = write_new_file(dir.path(), "shot", b"4").await.unwrap();

    assert_eq!(first.file_name, "shot.png");
    assert_eq!(first.size, 3);
    assert_eq!(second.file_name, "shot_1.png");
    assert_eq!(second.size, 4);
    assert_eq!(third.file_name, "shot");
    assert_eq!(fourth.file_name, "shot_1");
    assert_eq!(std::fs::read(dir.path().join("shot.png")).unwrap(), b"one");
}

/// Hands out a few bytes, then fails like a dropped connection.
struct BrokenReader {
    sent: bool,
}

impl AsyncRead for BrokenReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.sent {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            )));
        }

        self.sent = true;
        buf.put_slice(b"partial");
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn failed_write_removes_the_new_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut reader = BrokenReader { sent: false };

    let err = copy_to_new_file(dir.path(), "shot.png", &mut reader)
        .await
        .unwrap_err();

    match err {
        IngestError::Write { path, .. } => assert_eq!(path, dir.path().join("shot.png")),
        err => panic!("unexpected error: {}", err),
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

    // The name is free again.
    let stored = write_new_file(dir.path(), "shot.png", b"png").await.unwrap();
    assert_eq!(stored.file_name, "shot.png");
}

#[tokio::test]
async fn ensure_directory_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("x").join("y");

    ensure_directory(&path).await.unwrap();
    ensure_directory(&path).await.unwrap();

    assert!(path.is_dir());
    assert_eq!(std::fs::read_dir(dir.path().join("x")).unwrap().count(), 1);
}

#[tokio::test]
async fn ensure_directory_fails_on_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("file");
    std::fs::write(&path, b"").unwrap();

    assert!(ensure_directory(&path).await.is_err());
}

#[test]
fn free_space_of_missing_path_is_unknown() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(free_space(&dir.path().join("missing")), None);
}

/// Available bytes for `path` as reported by GNU `df`, if it is installed.
#[cfg(unix)]
fn df_available(path: &Path) -> Option<u64> {
    let output = std::process::Command::new("df")
        .args(["-B1", "--output=avail"])
        .arg(path)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }

    String::from_utf8(output.stdout)
        .ok()?
        .lines()
        .nth(1)?
        .trim()
        .parse()
        .ok()
}

#[cfg(unix)]
#[test]
fn free_space_reads_the_filesystem_holding_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();

    let outer = free_space(dir.path()).unwrap();
    let inner = free_space(&nested).unwrap();
    assert!(outer > 0);

    // Same filesystem; allow for other processes writing in between.
    let slack = 64 * 1024 * 1024;
    assert!(outer.abs_diff(inner) < slack, "{} vs {}", outer, inner);

    // Separately mounted filesystems (tmpfs here) report their own space, not
    // that of the filesystem they are mounted on.
    for path in [dir.path(), Path::new("/dev/shm")] {
        if !path.is_dir() {
            continue;
        }
        let Some(expected) = df_available(path) else {
            continue;
        };

        let actual = free_space(path).unwrap();
        assert!(
            actual.abs_diff(expected) < slack,
            "{}: {} vs df {}",
            path.display(),
            actual,
            expected
        );
    }
}
