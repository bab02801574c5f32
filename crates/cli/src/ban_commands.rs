use std::path::Path;

use {anyhow::Result, clap::Subcommand};

use courier_channels::{AccessStore, JsonFileStore};

#[derive(Subcommand)]
pub enum BanAction {
    /// List banned users and threads.
    List,
    /// Ban a user.
    User {
        id: String,
        /// Reason shown to the user.
        #[arg(long, default_value = "no reason given")]
        reason: String,
    },
    /// Ban a whole thread.
    Thread {
        id: String,
        #[arg(long, default_value = "no reason given")]
        reason: String,
    },
    /// Lift a user ban.
    UnbanUser { id: String },
    /// Lift a thread ban.
    UnbanThread { id: String },
}

pub async fn handle_bans(action: BanAction, store_path: &Path) -> Result<()> {
    let store = JsonFileStore::open(store_path).await?;
    match action {
        BanAction::List => {
            let data = store.snapshot().await;
            if data.banned_users.is_empty() && data.banned_threads.is_empty() {
                println!("No bans.");
            }
            for (id, reason) in &data.banned_users {
                println!("user   {id}: {reason}");
            }
            for (id, reason) in &data.banned_threads {
                println!("thread {id}: {reason}");
            }
        },
        BanAction::User { id, reason } => {
            store.ban_user(&id, &reason).await?;
            println!("Banned user {id}.");
        },
        BanAction::Thread { id, reason } => {
            store.ban_thread(&id, &reason).await?;
            println!("Banned thread {id}.");
        },
        BanAction::UnbanUser { id } => {
            if store.unban_user(&id).await? {
                println!("Unbanned user {id}.");
            } else {
                println!("User {id} was not banned.");
            }
        },
        BanAction::UnbanThread { id } => {
            if store.unban_thread(&id).await? {
                println!("Unbanned thread {id}.");
            } else {
                println!("Thread {id} was not banned.");
            }
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bans_are_written_to_the_store_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        handle_bans(
            BanAction::User {
                id: "u1".into(),
                reason: "spam".into(),
            },
            &path,
        )
        .await
        .unwrap();
        handle_bans(
            BanAction::Thread {
                id: "t1".into(),
                reason: "raid".into(),
            },
            &path,
        )
        .await
        .unwrap();
        handle_bans(BanAction::UnbanThread { id: "t1".into() }, &path)
            .await
            .unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.user_ban("u1").await.unwrap().as_deref(), Some("spam"));
        assert_eq!(store.thread_ban("t1").await.unwrap(), None);
    }
}
