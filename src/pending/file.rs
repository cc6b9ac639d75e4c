//! Directory-of-files pending store.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{pending_key, PendingRecord, PendingStore};
use crate::config::PendingConfig;
use crate::error::{As2Error, Result};

/// Pending store backed by two directories: one file per record and one
/// file per kept payload.
#[derive(Debug, Clone)]
pub struct FilePendingStore {
    info_dir: PathBuf,
    payload_dir: PathBuf,
}

impl FilePendingStore {
    /// Open the store, creating both directories if needed.
    pub async fn open(info_dir: impl Into<PathBuf>, payload_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            info_dir: info_dir.into(),
            payload_dir: payload_dir.into(),
        };
        for dir in [&store.info_dir, &store.payload_dir] {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                As2Error::Storage(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }
        Ok(store)
    }

    /// Open the store at the configured locations
    pub async fn from_config(config: &PendingConfig) -> Result<Self> {
        Self::open(&config.info_dir, &config.payload_dir).await
    }

    /// Directory holding pending records
    pub fn info_dir(&self) -> &Path {
        &self.info_dir
    }

    /// Directory holding kept payloads
    pub fn payload_dir(&self) -> &Path {
        &self.payload_dir
    }

    fn info_path(&self, message_id: &str) -> Result<PathBuf> {
        Ok(self.info_dir.join(pending_key(message_id)?))
    }

    fn payload_path(&self, message_id: &str) -> Result<PathBuf> {
        Ok(self.payload_dir.join(pending_key(message_id)?))
    }
}

/// Write via a synced temp file and rename so readers never see partial data.
async fn write_durable(path: &Path, data: &[u8]) -> Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await?;

    if let Some(parent) = path.parent() {
        // Directory fsync is not supported everywhere; the rename is already done.
        if let Ok(dir) = tokio::fs::File::open(parent).await {
            let _ = dir.sync_all().await;
        }
    }
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(As2Error::Storage(format!(
            "Failed to delete {}: {e}",
            path.display()
        ))),
    }
}

#[async_trait]
impl PendingStore for FilePendingStore {
    async fn put(&self, message_id: &str, record: &PendingRecord) -> Result<()> {
        let path = self.info_path(message_id)?;
        write_durable(&path, record.encode().as_bytes())
            .await
            .map_err(|e| {
                As2Error::Storage(format!("Failed to write pending record {}: {e}", path.display()))
            })?;
        tracing::debug!(message_id, path = %path.display(), "pending record stored");
        Ok(())
    }

    async fn get(&self, message_id: &str) -> Result<PendingRecord> {
        let path = self.info_path(message_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => PendingRecord::decode(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(As2Error::PendingNotFound(message_id.to_string()))
            },
            Err(e) => Err(As2Error::Storage(format!(
                "Failed to read pending record {}: {e}",
                path.display()
            ))),
        }
    }

    async fn remove(&self, message_id: &str) -> Result<()> {
        let path = self.info_path(message_id)?;
        if let Ok(text) = tokio::fs::read_to_string(&path).await {
            if let Ok(record) = PendingRecord::decode(&text) {
                if !record.payload_ref.is_empty() {
                    let payload = PathBuf::from(&record.payload_ref);
                    remove_if_present(&payload).await?;
                    tracing::info!(message_id, path = %payload.display(), "pending payload deleted");
                }
            }
        }
        remove_if_present(&path).await?;
        tracing::info!(message_id, path = %path.display(), "pending record deleted");
        Ok(())
    }

    async fn put_payload(&self, message_id: &str, data: &[u8]) -> Result<String> {
        let path = self.payload_path(message_id)?;
        write_durable(&path, data).await.map_err(|e| {
            As2Error::Storage(format!("Failed to write pending payload {}: {e}", path.display()))
        })?;
        Ok(path.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_store() -> (tempfile::TempDir, FilePendingStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePendingStore::open(dir.path().join("info"), dir.path().join("payload"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_get_with_normalized_key() {
        let (_dir, store) = temp_store().await;
        let record = PendingRecord::new("abc123, sha256", "/tmp/payload");

        store.put("<m1@alpha_beta>", &record).await.unwrap();

        assert_eq!(store.get("<m1@alpha_beta>").await.unwrap(), record);
        assert_eq!(store.get(" m1@alpha_beta ").await.unwrap(), record);
        assert!(store.info_dir().join("m1@alpha_beta").exists());
    }

    #[tokio::test]
    async fn test_remove_then_get_is_not_found() {
        let (_dir, store) = temp_store().await;
        let payload_ref = store.put_payload("<m2@a_b>", b"secured body").await.unwrap();
        store
            .put("<m2@a_b>", &PendingRecord::new("abc, sha1", payload_ref.clone()))
            .await
            .unwrap();
        assert!(Path::new(&payload_ref).exists());

        store.remove("<m2@a_b>").await.unwrap();

        assert!(matches!(
            store.get("<m2@a_b>").await,
            Err(As2Error::PendingNotFound(_))
        ));
        assert!(!Path::new(&payload_ref).exists());
    }

    #[tokio::test]
    async fn test_remove_absent_is_ok() {
        let (_dir, store) = temp_store().await;
        store.remove("<never-stored@a_b>").await.unwrap();
        store.remove("<never-stored@a_b>").await.unwrap();
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (_dir, store) = temp_store().await;
        store
            .put("<m3>", &PendingRecord::new("first, sha1", ""))
            .await
            .unwrap();
        store
            .put("<m3>", &PendingRecord::new("second, sha1", ""))
            .await
            .unwrap();
        assert_eq!(store.get("<m3>").await.unwrap().mic, "second, sha1");
        assert!(!store.info_dir().join("m3.tmp").exists());
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let info = dir.path().join("info");
        let payload = dir.path().join("payload");
        {
            let store = FilePendingStore::open(&info, &payload).await.unwrap();
            store
                .put("<m4@a_b>", &PendingRecord::new("abc, sha1", "ref"))
                .await
                .unwrap();
        }
        let reopened = FilePendingStore::open(&info, &payload).await.unwrap();
        assert_eq!(reopened.get("<m4@a_b>").await.unwrap().payload_ref, "ref");
    }

    #[tokio::test]
    async fn test_invalid_id_rejected() {
        let (_dir, store) = temp_store().await;
        assert!(matches!(
            store.get("<../escape>").await,
            Err(As2Error::InvalidMessageId(_))
        ));
    }
}
