//! In-crate test doubles.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU64, Ordering},
};

use {
    async_trait::async_trait,
    courier_channels::{ChatClient, MemoryStore},
    courier_common::types::{InboundEvent, SentMessage, ThreadInfo, UserInfo},
    courier_config::CourierConfig,
};

use crate::{
    command::Command,
    context::CommandContext,
    correlator::ReplyCorrelator,
    guard::SharedPolicy,
    registry::CommandRegistry,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub text: String,
    pub thread_id: String,
    pub reply_to: Option<String>,
    pub message_id: String,
}

/// Records every outgoing message and serves canned metadata.
#[derive(Default)]
pub struct MockClient {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicU64,
    thread: Option<ThreadInfo>,
    fail_thread_info: bool,
    fail_user_info: bool,
}

impl MockClient {
    pub fn with_thread(mut self, info: ThreadInfo) -> Self {
        self.thread = Some(info);
        self
    }

    pub fn failing_thread_info(mut self) -> Self {
        self.fail_thread_info = true;
        self
    }

    pub fn failing_user_info(mut self) -> Self {
        self.fail_user_info = true;
        self
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.text).collect()
    }
}

#[async_trait]
impl ChatClient for MockClient {
    async fn send_message(
        &self,
        text: &str,
        thread_id: &str,
        reply_to: Option<&str>,
    ) -> anyhow::Result<SentMessage> {
        let message_id = format!("bot-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.sent.lock().unwrap().push(Sent {
            text: text.to_string(),
            thread_id: thread_id.to_string(),
            reply_to: reply_to.map(str::to_string),
            message_id: message_id.clone(),
        });
        Ok(SentMessage { message_id })
    }

    async fn get_user_info(&self, user_id: &str) -> anyhow::Result<UserInfo> {
        if self.fail_user_info {
            anyhow::bail!("user lookup unavailable");
        }
        Ok(UserInfo {
            name: format!("User {user_id}"),
        })
    }

    async fn get_thread_info(&self, _thread_id: &str) -> anyhow::Result<ThreadInfo> {
        if self.fail_thread_info {
            anyhow::bail!("thread lookup unavailable");
        }
        Ok(self.thread.clone().unwrap_or_default())
    }
}

pub async fn noop(_ctx: CommandContext) -> anyhow::Result<()> {
    Ok(())
}

/// Context for `command` as if `body` arrived from `u1` in `t1` as `m1`.
pub fn context_for(
    client: Arc<MockClient>,
    command: Arc<Command>,
    body: &str,
) -> (CommandContext, ReplyCorrelator) {
    let correlator = ReplyCorrelator::new();
    let args = body
        .split_whitespace()
        .skip(1)
        .map(str::to_string)
        .collect();
    let ctx = CommandContext::new(
        client,
        Arc::new(MemoryStore::new()),
        Arc::new(CourierConfig::default()),
        SharedPolicy::default(),
        Arc::new(CommandRegistry::new()),
        correlator.clone(),
        command,
        InboundEvent::message("t1", "u1", "m1", body),
        args,
        "!".into(),
    );
    (ctx, correlator)
}
