use std::path::{Path, PathBuf};

use {
    async_trait::async_trait,
    serde_json::Value,
    tokio::sync::Mutex,
    tracing::{debug, info},
};

use crate::{
    error::{Error, Result},
    store::{AccessStore, GroupRecord, StoreData, UserRecord},
};

/// Store backed by a single JSON document on disk.
///
/// The whole document is rewritten after every mutation (write to a
/// sibling temp file, then rename). Writers are serialized by the inner
/// mutex, so the file always reflects the last completed write.
pub struct JsonFileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => StoreData::default(),
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| Error::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "store file not found, starting empty");
                StoreData::default()
            },
            Err(e) => return Err(Error::file(path, e)),
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the whole document.
    pub async fn snapshot(&self) -> StoreData {
        self.read(StoreData::clone).await
    }

    /// Apply `f` to a copy of the document and keep it only once it is on
    /// disk, so a failed write leaves memory unchanged.
    async fn mutate<R>(&self, f: impl FnOnce(&mut StoreData) -> R) -> Result<R> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let out = f(&mut next);
        self.persist(&next).await?;
        *data = next;
        Ok(out)
    }

    async fn read<R>(&self, f: impl FnOnce(&StoreData) -> R) -> R {
        let data = self.data.lock().await;
        f(&data)
    }

    async fn persist(&self, data: &StoreData) -> Result<()> {
        let raw = serde_json::to_string_pretty(data)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::file(parent, e))?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, raw)
            .await
            .map_err(|e| Error::file(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::file(&self.path, e))?;
        debug!(path = %self.path.display(), "store persisted");
        Ok(())
    }
}

#[async_trait]
impl AccessStore for JsonFileStore {
    async fn set_user(&self, user_id: &str, record: UserRecord) -> anyhow::Result<()> {
        self.mutate(|d| {
            d.users.insert(user_id.to_string(), record);
        })
        .await?;
        Ok(())
    }

    async fn set_group(&self, thread_id: &str, record: GroupRecord) -> anyhow::Result<()> {
        self.mutate(|d| d.merge_group(thread_id, record)).await?;
        Ok(())
    }

    async fn group_prefix(&self, thread_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read(|d| d.group_prefix(thread_id)).await)
    }

    async fn user_ban(&self, user_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.read(|d| d.banned_users.get(user_id).cloned()).await)
    }

    async fn thread_ban(&self, thread_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .read(|d| d.banned_threads.get(thread_id).cloned())
            .await)
    }

    async fn ban_user(&self, user_id: &str, reason: &str) -> anyhow::Result<()> {
        self.mutate(|d| {
            d.banned_users
                .insert(user_id.to_string(), reason.to_string());
        })
        .await?;
        Ok(())
    }

    async fn unban_user(&self, user_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .mutate(|d| d.banned_users.remove(user_id).is_some())
            .await?)
    }

    async fn ban_thread(&self, thread_id: &str, reason: &str) -> anyhow::Result<()> {
        self.mutate(|d| {
            d.banned_threads
                .insert(thread_id.to_string(), reason.to_string());
        })
        .await?;
        Ok(())
    }

    async fn unban_thread(&self, thread_id: &str) -> anyhow::Result<bool> {
        Ok(self
            .mutate(|d| d.banned_threads.remove(thread_id).is_some())
            .await?)
    }

    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self.read(|d| d.values.get(key).cloned()).await)
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.mutate(|d| {
            d.values.insert(key.to_string(), value);
        })
        .await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, serde_json::json};

    #[tokio::test]
    async fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json")).await.unwrap();
        assert_eq!(store.user_ban("u1").await.unwrap(), None);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("db.json");

        let store = JsonFileStore::open(&path).await.unwrap();
        store.ban_thread("t1", "spam").await.unwrap();
        store.set("cooldown_ping_u1", json!(42)).await.unwrap();
        store
            .set_group("t1", GroupRecord {
                name: Some("Lobby".into()),
                prefix: Some("#".into()),
            })
            .await
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            reopened.thread_ban("t1").await.unwrap().as_deref(),
            Some("spam")
        );
        assert_eq!(
            reopened.get("cooldown_ping_u1").await.unwrap(),
            Some(json!(42))
        );
        assert_eq!(
            reopened.group_prefix("t1").await.unwrap().as_deref(),
            Some("#")
        );
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("db.json")).await.unwrap();
        // A directory squatting on the temp file path makes every write fail.
        std::fs::create_dir(dir.path().join("db.tmp")).unwrap();

        assert!(store.ban_user("u1", "spam").await.is_err());
        assert_eq!(store.user_ban("u1").await.unwrap(), None);
        assert!(store.set("cooldown_ping_u1", json!(1)).await.is_err());
        assert_eq!(store.get("cooldown_ping_u1").await.unwrap(), None);
        assert_eq!(store.snapshot().await, StoreData::default());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::open(&path).await.err().unwrap();
        assert!(matches!(err, Error::Corrupt { .. }), "got {err}");
    }

    #[tokio::test]
    async fn reads_documents_written_by_hand() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(&path, r#"{ "bannedUsers": { "u9": "scam links" } }"#).unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
            store.user_ban("u9").await.unwrap().as_deref(),
            Some("scam links")
        );
        assert!(store.unban_user("u9").await.unwrap());

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("u9"));
        assert!(store.snapshot().await.banned_users.is_empty());
    }
}
