use {
    anyhow::Result,
    async_trait::async_trait,
    courier_common::types::{SentMessage, ThreadInfo, UserInfo},
};

/// Capability handle for the chat platform.
///
/// Every call may suspend; implementations must tolerate being called from
/// many tasks at once.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Deliver `text` to a thread, optionally quoting `reply_to`.
    async fn send_message(
        &self,
        text: &str,
        thread_id: &str,
        reply_to: Option<&str>,
    ) -> Result<SentMessage>;

    /// Look up a user's platform profile.
    async fn get_user_info(&self, user_id: &str) -> Result<UserInfo>;

    /// Look up live thread metadata (participants and admins).
    async fn get_thread_info(&self, thread_id: &str) -> Result<ThreadInfo>;
}
