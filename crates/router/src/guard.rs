//! Access checks run before a command is allowed to execute.
//!
//! Order matters and every check short-circuits:
//! sender ban, thread ban, admin-only mode, then (prefixed commands only)
//! permission tier and cooldown.

use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use {
    courier_channels::{AccessStore, ChatClient},
    courier_config::AccessConfig,
    serde_json::json,
    tracing::{debug, warn},
};

use crate::{
    command::{CommandDescriptor, Permission},
    error::{Error, Result},
};

/// Outcome of a single access check.
pub type Verdict = std::result::Result<(), AccessDenied>;

/// Reason an invocation was refused. `Display` is the notice sent back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    UserBanned { reason: String },
    ThreadBanned { reason: String },
    AdminOnly,
    NotBotAdmin,
    NotThreadAdmin,
    Cooldown { remaining_secs: u64 },
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserBanned { reason } => write!(
                f,
                "Access denied: you have been banned from using this bot. Reason: {reason}. Contact a bot admin."
            ),
            Self::ThreadBanned { reason } => write!(
                f,
                "Access denied: this group has been banned from using this bot. Reason: {reason}. Contact a bot admin."
            ),
            Self::AdminOnly => write!(f, "The bot is in admin-only mode right now."),
            Self::NotBotAdmin => write!(f, "Only bot admins can use this command."),
            Self::NotThreadAdmin => write!(f, "Only group admins can use this command."),
            Self::Cooldown { remaining_secs } => write!(
                f,
                "Please wait {remaining_secs} seconds before using this command again."
            ),
        }
    }
}

/// Bot-wide access settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    pub admin_only: bool,
    /// Users let through while admin-only mode is on.
    pub admin_allowlist: Vec<String>,
    /// Bot admins (permission tier 1).
    pub admin_ids: Vec<String>,
}

impl AccessPolicy {
    pub fn from_config(config: &AccessConfig) -> Self {
        Self {
            admin_only: config.admin_only,
            admin_allowlist: config.admin_allowlist.clone(),
            admin_ids: config.admin_ids.clone(),
        }
    }

    pub fn is_bot_admin(&self, user_id: &str) -> bool {
        self.admin_ids.iter().any(|id| id == user_id)
    }

    /// Whether admin-only mode lets `user_id` through.
    pub fn admits(&self, user_id: &str) -> bool {
        !self.admin_only || self.admin_allowlist.iter().any(|id| id == user_id)
    }
}

/// [`AccessPolicy`] shared between the router and commands that change it.
#[derive(Debug, Clone, Default)]
pub struct SharedPolicy(Arc<RwLock<AccessPolicy>>);

impl SharedPolicy {
    pub fn new(policy: AccessPolicy) -> Self {
        Self(Arc::new(RwLock::new(policy)))
    }

    /// Copy of the current policy.
    pub fn snapshot(&self) -> AccessPolicy {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, f: impl FnOnce(&mut AccessPolicy)) {
        let mut policy = self.0.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut policy);
    }

    pub fn set_admin_only(&self, enabled: bool) {
        self.update(|p| p.admin_only = enabled);
    }
}

/// Ban and admin-only checks, shared by every invocation path.
pub async fn check_standing(
    store: &dyn AccessStore,
    policy: &AccessPolicy,
    sender_id: &str,
    thread_id: &str,
) -> Result<Verdict> {
    if let Some(reason) = store
        .user_ban(sender_id)
        .await
        .map_err(|e| Error::store("user ban lookup", e))?
    {
        debug!(sender_id, "denied: user banned");
        return Ok(Err(AccessDenied::UserBanned { reason }));
    }
    if let Some(reason) = store
        .thread_ban(thread_id)
        .await
        .map_err(|e| Error::store("thread ban lookup", e))?
    {
        debug!(thread_id, "denied: thread banned");
        return Ok(Err(AccessDenied::ThreadBanned { reason }));
    }
    if !policy.admits(sender_id) {
        debug!(sender_id, "denied: admin-only mode");
        return Ok(Err(AccessDenied::AdminOnly));
    }
    Ok(Ok(()))
}

/// Permission tier check. Thread admin status is looked up live; a failed
/// lookup denies.
pub async fn check_permission(
    client: &dyn ChatClient,
    policy: &AccessPolicy,
    permission: Permission,
    sender_id: &str,
    thread_id: &str,
) -> Verdict {
    match permission {
        Permission::Public => Ok(()),
        Permission::BotAdmin if policy.is_bot_admin(sender_id) => Ok(()),
        Permission::BotAdmin => Err(AccessDenied::NotBotAdmin),
        Permission::ThreadAdmin => match client.get_thread_info(thread_id).await {
            Ok(info) if info.is_admin_participant(sender_id) => Ok(()),
            Ok(_) => Err(AccessDenied::NotThreadAdmin),
            Err(e) => {
                warn!(thread_id, sender_id, error = %e, "thread info lookup failed, denying");
                Err(AccessDenied::NotThreadAdmin)
            },
        },
    }
}

/// Store key holding the last time `user_id` ran `command`.
pub fn cooldown_key(command: &str, user_id: &str) -> String {
    format!("cooldown_{command}_{user_id}")
}

/// Pure cooldown rule. `remaining_secs` rounds up.
pub fn check_cooldown(last_used_ms: Option<i64>, cooldown_secs: u64, now_ms: i64) -> Verdict {
    let Some(last_used) = last_used_ms else {
        return Ok(());
    };
    let window_ms = i64::try_from(cooldown_secs.saturating_mul(1_000)).unwrap_or(i64::MAX);
    let elapsed = now_ms.saturating_sub(last_used);
    if elapsed >= window_ms {
        return Ok(());
    }
    let remaining_ms = window_ms - elapsed;
    let remaining_secs = (remaining_ms as u64).div_ceil(1_000);
    Err(AccessDenied::Cooldown { remaining_secs })
}

/// Apply the command's cooldown for `sender_id` and, when it passes, record
/// `now_ms` as the new last use.
pub async fn enforce_cooldown(
    store: &dyn AccessStore,
    descriptor: &CommandDescriptor,
    sender_id: &str,
    now_ms: i64,
) -> Result<Verdict> {
    let Some(cooldown_secs) = descriptor.cooldown() else {
        return Ok(Ok(()));
    };
    let key = cooldown_key(&descriptor.name, sender_id);
    let last_used = store
        .get(&key)
        .await
        .map_err(|e| Error::store("cooldown lookup", e))?
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)));

    if let Err(denied) = check_cooldown(last_used, cooldown_secs, now_ms) {
        debug!(command = %descriptor.name, sender_id, "denied: cooldown");
        return Ok(Err(denied));
    }
    store
        .set(&key, json!(now_ms))
        .await
        .map_err(|e| Error::store("cooldown write", e))?;
    Ok(Ok(()))
}
