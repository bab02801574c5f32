//! Config schema types.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Prefix used when neither the config nor the thread overrides it.
pub const DEFAULT_PREFIX: &str = "!";

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierConfig {
    /// Default command prefix; threads may override it in the store.
    pub prefix: String,
    /// Bot display name used in help output.
    pub bot_name: String,
    pub access: AccessConfig,
    pub pacing: PacingConfig,
    pub replies: RepliesConfig,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            bot_name: "courier".into(),
            access: AccessConfig::default(),
            pacing: PacingConfig::default(),
            replies: RepliesConfig::default(),
            logging: LoggingConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Who may use the bot and its privileged commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Start in admin-only mode.
    pub admin_only: bool,
    /// Users allowed through while admin-only mode is on.
    pub admin_allowlist: Vec<String>,
    /// Bot administrators (permission tier 1).
    pub admin_ids: Vec<String>,
}

/// Randomized delay inserted before a prefixed command runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_ms: 1_000,
            max_ms: 3_000,
        }
    }
}

impl PacingConfig {
    /// No delay at all; used by tests and local consoles.
    pub fn immediate() -> Self {
        Self {
            min_ms: 0,
            max_ms: 0,
        }
    }
}

/// Follow-up reply tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepliesConfig {
    /// How long a command waits for a follow-up reply.
    pub timeout_secs: u64,
    /// Period of the expired-listener sweep.
    pub sweep_interval_secs: u64,
}

impl Default for RepliesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            sweep_interval_secs: 600,
        }
    }
}

impl RepliesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log every inbound event object at info level.
    pub message_objects: bool,
}

/// Where users, threads, bans and cooldowns are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON store file. In-memory only when unset.
    pub path: Option<PathBuf>,
}
