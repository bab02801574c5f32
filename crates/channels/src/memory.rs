use {anyhow::Result, async_trait::async_trait, serde_json::Value, tokio::sync::RwLock};

use crate::store::{AccessStore, GroupRecord, StoreData, UserRecord};

/// Process-local store; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from an existing document.
    pub fn with_data(data: StoreData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Copy of the current document.
    pub async fn snapshot(&self) -> StoreData {
        self.data.read().await.clone()
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn set_user(&self, user_id: &str, record: UserRecord) -> Result<()> {
        self.data
            .write()
            .await
            .users
            .insert(user_id.to_string(), record);
        Ok(())
    }

    async fn set_group(&self, thread_id: &str, record: GroupRecord) -> Result<()> {
        self.data.write().await.merge_group(thread_id, record);
        Ok(())
    }

    async fn group_prefix(&self, thread_id: &str) -> Result<Option<String>> {
        Ok(self.data.read().await.group_prefix(thread_id))
    }

    async fn user_ban(&self, user_id: &str) -> Result<Option<String>> {
        Ok(self.data.read().await.banned_users.get(user_id).cloned())
    }

    async fn thread_ban(&self, thread_id: &str) -> Result<Option<String>> {
        Ok(self.data.read().await.banned_threads.get(thread_id).cloned())
    }

    async fn ban_user(&self, user_id: &str, reason: &str) -> Result<()> {
        self.data
            .write()
            .await
            .banned_users
            .insert(user_id.to_string(), reason.to_string());
        Ok(())
    }

    async fn unban_user(&self, user_id: &str) -> Result<bool> {
        Ok(self.data.write().await.banned_users.remove(user_id).is_some())
    }

    async fn ban_thread(&self, thread_id: &str, reason: &str) -> Result<()> {
        self.data
            .write()
            .await
            .banned_threads
            .insert(thread_id.to_string(), reason.to_string());
        Ok(())
    }

    async fn unban_thread(&self, thread_id: &str) -> Result<bool> {
        Ok(self
            .data
            .write()
            .await
            .banned_threads
            .remove(thread_id)
            .is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.data.read().await.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.data
            .write()
            .await
            .values
            .insert(key.to_string(), value);
        Ok(())
    }
}
