use std::collections::BTreeMap;

use {
    anyhow::Result,
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    serde_json::Value,
};

/// A known platform user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub name: String,
}

/// A known thread and its command prefix override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

/// Persistent storage for users, threads, bans and arbitrary keyed values
/// (cooldown timestamps live here).
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Upsert a user record.
    async fn set_user(&self, user_id: &str, record: UserRecord) -> Result<()>;

    /// Merge a group record: `None` fields keep their stored value.
    async fn set_group(&self, thread_id: &str, record: GroupRecord) -> Result<()>;

    /// Prefix override configured for a thread.
    async fn group_prefix(&self, thread_id: &str) -> Result<Option<String>>;

    /// Ban reason when the user is banned.
    async fn user_ban(&self, user_id: &str) -> Result<Option<String>>;

    /// Ban reason when the thread is banned.
    async fn thread_ban(&self, thread_id: &str) -> Result<Option<String>>;

    async fn ban_user(&self, user_id: &str, reason: &str) -> Result<()>;

    /// Returns `true` if the user was banned.
    async fn unban_user(&self, user_id: &str) -> Result<bool>;

    async fn ban_thread(&self, thread_id: &str, reason: &str) -> Result<()>;

    /// Returns `true` if the thread was banned.
    async fn unban_thread(&self, thread_id: &str) -> Result<bool>;

    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// The full store document, shared by every [`AccessStore`] implementation
/// in this crate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreData {
    pub users: BTreeMap<String, UserRecord>,
    pub groups: BTreeMap<String, GroupRecord>,
    pub banned_users: BTreeMap<String, String>,
    pub banned_threads: BTreeMap<String, String>,
    pub values: BTreeMap<String, Value>,
}

impl StoreData {
    pub fn merge_group(&mut self, thread_id: &str, record: GroupRecord) {
        let entry = self.groups.entry(thread_id.to_string()).or_default();
        if record.name.is_some() {
            entry.name = record.name;
        }
        if record.prefix.is_some() {
            entry.prefix = record.prefix;
        }
    }

    pub fn group_prefix(&self, thread_id: &str) -> Option<String> {
        self.groups
            .get(thread_id)
            .and_then(|g| g.prefix.clone())
            .filter(|p| !p.is_empty())
    }
}
