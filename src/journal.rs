//! On-disk record of inbound events and the media they carried.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Entry<'a, T: Serialize> {
    kind: &'a str,
    recorded_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<&'a Path>,
    event: &'a T,
}

/// Appends one JSON line per event to `history/events-<date>.jsonl` and
/// stores media under `media/` named by content hash.
#[derive(Clone, Debug)]
pub struct EventJournal {
    history_dir: PathBuf,
    media_dir: PathBuf,
}

impl EventJournal {
    pub fn new(history_dir: PathBuf, media_dir: PathBuf) -> Self {
        Self {
            history_dir,
            media_dir,
        }
    }

    pub async fn record<T: Serialize>(&self, kind: &str, event: &T) -> Result<(), JournalError> {
        self.append(kind, None, event).await
    }

    /// Writes `data` to the media directory and records the event with the
    /// file's path. Returns that path.
    pub async fn record_file<T: Serialize>(
        &self,
        kind: &str,
        event: &T,
        mimetype: &str,
        data: &[u8],
    ) -> Result<PathBuf, JournalError> {
        ensure_private_dir(&self.media_dir).await?;
        let path = self.media_dir.join(media_file_name(mimetype, data));
        if !fs::try_exists(&path).await? {
            fs::write(&path, data).await?;
            restrict(&path, 0o600).await?;
        }
        info!("saved {kind} media to {}", path.display());
        self.append(kind, Some(&path), event).await?;
        Ok(path)
    }

    async fn append<T: Serialize>(&self, kind: &str, file: Option<&Path>, event: &T) -> Result<(), JournalError> {
        ensure_private_dir(&self.history_dir).await?;
        let now = Utc::now();
        let entry = Entry {
            kind,
            recorded_at: now.to_rfc3339(),
            file,
            event,
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');

        let path = self
            .history_dir
            .join(format!("events-{}.jsonl", now.format("%Y-%m-%d")));
        let mut handle = OpenOptions::new().create(true).append(true).open(&path).await?;
        handle.write_all(&line).await?;
        handle.flush().await?;
        debug!("journaled {kind} to {}", path.display());
        Ok(())
    }
}

async fn ensure_private_dir(path: &Path) -> Result<(), io::Error> {
    fs::create_dir_all(path).await?;
    restrict(path, 0o700).await
}

#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), io::Error> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), io::Error> {
    Ok(())
}

fn media_file_name(mimetype: &str, data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    let hash: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
    let essence = mimetype.split(';').next().unwrap_or_default().trim();
    let extension = mime_guess::get_mime_extensions_str(essence)
        .and_then(|extensions| preferred_extension(essence, extensions))
        .unwrap_or("bin");
    format!("{hash}.{extension}")
}

// mime_guess lists extensions alphabetically, so "jfif" would win for jpeg.
fn preferred_extension(essence: &str, extensions: &'static [&'static str]) -> Option<&'static str> {
    if essence == "image/jpeg" {
        return Some("jpg");
    }
    let subtype = essence.rsplit('/').next().unwrap_or_default();
    extensions
        .iter()
        .copied()
        .find(|ext| *ext == subtype)
        .or_else(|| extensions.first().copied())
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn journal_lines(dir: &Path) -> Vec<Value> {
        let mut lines = Vec::new();
        for entry in std::fs::read_dir(dir).expect("history dir") {
            let contents = std::fs::read_to_string(entry.expect("entry").path()).expect("read");
            lines.extend(contents.lines().map(|line| serde_json::from_str::<Value>(line).expect("json line")));
        }
        lines
    }

    #[tokio::test]
    async fn records_events_as_json_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = EventJournal::new(dir.path().join("history"), dir.path().join("media"));

        journal.record("Message", &json!({"id": "A"})).await.expect("first");
        journal.record("Message", &json!({"id": "B"})).await.expect("second");

        let lines = journal_lines(&dir.path().join("history"));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "Message");
        assert_eq!(lines[1]["event"]["id"], "B");
        assert!(lines[0].get("file").is_none());
    }

    #[tokio::test]
    async fn media_is_named_by_hash_and_type() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = EventJournal::new(dir.path().join("history"), dir.path().join("media"));

        let path = journal
            .record_file("Message.ImageMessage", &json!({"id": "C"}), "image/jpeg", b"abc")
            .await
            .expect("record");

        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad.jpg")
        );
        assert_eq!(std::fs::read(&path).expect("media"), b"abc");
        let lines = journal_lines(&dir.path().join("history"));
        assert_eq!(lines[0]["file"], &*path.to_string_lossy());
    }

    #[cfg(unix)]
    #[tokio::test(flavor = "current_thread")]
    async fn media_and_history_stay_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let journal = EventJournal::new(dir.path().join("history"), dir.path().join("media"));
        let path = journal
            .record_file("Message.StickerMessage", &json!({"id": "D"}), "image/webp", b"webp")
            .await
            .expect("record");
        let again = journal
            .record_file("Message.StickerMessage", &json!({"id": "E"}), "image/webp", b"webp")
            .await
            .expect("record again");

        assert_eq!(path, again);
        let mode = |path: &Path| std::fs::metadata(path).expect("metadata").permissions().mode() & 0o777;
        assert_eq!(mode(&path), 0o600);
        assert_eq!(mode(&dir.path().join("media")), 0o700);
        assert_eq!(mode(&dir.path().join("history")), 0o700);
        assert_eq!(journal_lines(&dir.path().join("history")).len(), 2);
    }

    #[test]
    fn extension_falls_back_for_unknown_types() {
        assert!(media_file_name("audio/ogg; codecs=opus", b"x").ends_with(".ogg"));
        assert!(media_file_name("image/png", b"x").ends_with(".png"));
        assert!(media_file_name("application/x-unheard-of", b"x").ends_with(".bin"));
    }
}
