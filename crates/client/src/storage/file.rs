use super::TokenStore;
use crate::error::ClientError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::debug;

type Entries = BTreeMap<String, String>;

/// Token store persisted as a JSON object on disk
///
/// The file is re-read on every call. Writes replace the file atomically via
/// a uniquely named sibling temp file, so a reader never sees a half-written
/// credential pair. On unix the file is readable by its owner only.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Entries, ClientError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Entries::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(ClientError::Storage(format!(
                "failed to read {}: {e}",
                self.path.display()
            ))),
        }
    }

    async fn save(&self, entries: &Entries) -> Result<(), ClientError> {
        let content = serde_json::to_vec_pretty(entries)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_private(&path, &content))
            .await
            .map_err(|e| ClientError::Storage(format!("token store write task failed: {e}")))??;
        debug!("Wrote token store {}", self.path.display());
        Ok(())
    }
}

/// Write `content` to a uniquely named sibling file readable only by the
/// owner, then rename it over `path`
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ClientError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), ClientError> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        let before = entries.len();
        for key in keys {
            entries.remove(*key);
        }
        if entries.len() == before {
            return Ok(());
        }
        self.save(&entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(temp_dir.path().join("tokens.json"));

        assert_eq!(store.get("access_token").await.unwrap(), None);
        store.remove(&["access_token"]).await.unwrap();
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_values_survive_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("tokens.json");

        let store = FileTokenStore::new(&path);
        store.set("access_token", "A1").await.unwrap();
        store.set("refresh_token", "R1").await.unwrap();

        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.get("access_token").await.unwrap().as_deref(), Some("A1"));
        assert_eq!(reopened.get("refresh_token").await.unwrap().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn test_sees_writes_from_other_instance() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.json");

        let first = FileTokenStore::new(&path);
        let second = FileTokenStore::new(&path);

        first.set("access_token", "A1").await.unwrap();
        assert_eq!(second.get("access_token").await.unwrap().as_deref(), Some("A1"));

        second.set("access_token", "A2").await.unwrap();
        assert_eq!(first.get("access_token").await.unwrap().as_deref(), Some("A2"));
    }

    #[tokio::test]
    async fn test_remove_both_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(temp_dir.path().join("tokens.json"));
        store.set("access_token", "A1").await.unwrap();
        store.set("refresh_token", "R1").await.unwrap();
        store.set("theme", "dark").await.unwrap();

        store.remove(&["access_token", "refresh_token"]).await.unwrap();

        assert_eq!(store.get("access_token").await.unwrap(), None);
        assert_eq!(store.get("refresh_token").await.unwrap(), None);
        assert_eq!(store.get("theme").await.unwrap().as_deref(), Some("dark"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_token_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(temp_dir.path().join("tokens.json"));
        store.set("refresh_token", "R1").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_writers_do_not_collide() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.json");

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = FileTokenStore::new(&path);
            handles.push(tokio::spawn(async move {
                store.set("access_token", &format!("A{i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let store = FileTokenStore::new(&path);
        assert!(store.get("access_token").await.unwrap().is_some());
        let leftovers = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileTokenStore::new(&path);
        assert!(matches!(
            store.get("access_token").await,
            Err(ClientError::Serialization(_))
        ));
    }
}
