//! Per-event dispatch: reply correlation, unprefixed triggers, then
//! prefixed commands behind the access guard.

use std::{sync::Arc, time::Duration};

use {
    courier_channels::{AccessStore, ChatClient, GroupRecord, UserRecord},
    courier_common::types::InboundEvent,
    courier_config::CourierConfig,
    rand::Rng,
    tracing::{debug, error, info, warn},
};

use crate::{
    clock::{Clock, SystemClock},
    command::{Command, CommandHandler, Invocation},
    context::CommandContext,
    correlator::ReplyCorrelator,
    error::Result,
    guard::{self, AccessDenied, AccessPolicy, SharedPolicy},
    notice,
    registry::CommandRegistry,
    resolver,
};

/// What the router did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing to do (ambient event, or a message that is not for us).
    Ignored,
    /// The event replied to a tracked message.
    Reply { handled: bool },
    /// Unprefixed triggers fired and the body was not a prefixed command.
    Triggered { commands: Vec<String> },
    /// The body was the bare prefix; a help pointer was sent.
    Help,
    /// A check refused the invocation; its notice was sent.
    Denied(AccessDenied),
    NotInstalled { name: String },
    /// A chat-only command was invoked with the prefix.
    WrongConvention { name: String },
    Executed { command: String },
    /// The command raised an error; a failure notice was sent.
    Failed { command: String },
}

/// Routes inbound events to commands.
pub struct Router {
    client: Arc<dyn ChatClient>,
    store: Arc<dyn AccessStore>,
    registry: Arc<CommandRegistry>,
    config: Arc<CourierConfig>,
    policy: SharedPolicy,
    correlator: ReplyCorrelator,
    clock: Arc<dyn Clock>,
}

impl Router {
    pub fn new(
        client: Arc<dyn ChatClient>,
        store: Arc<dyn AccessStore>,
        registry: CommandRegistry,
        config: CourierConfig,
    ) -> Self {
        let policy = SharedPolicy::new(AccessPolicy::from_config(&config.access));
        Self {
            client,
            store,
            registry: Arc::new(registry),
            config: Arc::new(config),
            policy,
            correlator: ReplyCorrelator::new(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SharedPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn correlator(&self) -> &ReplyCorrelator {
        &self.correlator
    }

    pub fn policy(&self) -> &SharedPolicy {
        &self.policy
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CourierConfig {
        &self.config
    }

    /// Route a single inbound event.
    ///
    /// Command failures are reported to the user and never returned; only
    /// store failures during access checks surface as errors.
    pub async fn handle_event(&self, event: InboundEvent) -> Result<Dispatch> {
        if self.config.logging.message_objects {
            info!(event = ?event, "message object");
        }

        self.refresh_metadata(&event);

        if event.is_ambient() {
            return Ok(Dispatch::Ignored);
        }

        if let Some(key) = event.replied_to()
            && self.correlator.contains(key)
        {
            let handled = self.correlator.resolve(key, &event).await;
            debug!(thread_id = %event.thread_id, key, handled, "reply routed");
            return Ok(Dispatch::Reply { handled });
        }

        let prefix = self.thread_prefix(&event.thread_id).await;
        let body = event.text();

        let mut fired = Vec::new();
        let triggers = resolver::chat_triggers(&self.registry, body);
        if !triggers.is_empty() {
            if let Err(denied) = self.standing(&event).await? {
                return Ok(self.deny(&event, denied).await);
            }
            for trigger in triggers {
                let Some(handler) = trigger.command.on_chat() else {
                    continue;
                };
                let ctx = self.context(&event, trigger.command, trigger.args, &prefix);
                self.invoke(&event, trigger.command.name(), handler.as_ref(), ctx)
                    .await;
                fired.push(trigger.command.name().to_string());
            }
        }

        if body == prefix {
            if let Err(denied) = self.standing(&event).await? {
                return Ok(self.deny(&event, denied).await);
            }
            self.notify(&event, &notice::help_pointer(&prefix)).await;
            return Ok(Dispatch::Help);
        }

        let Some(rest) = body.strip_prefix(prefix.as_str()) else {
            return Ok(if fired.is_empty() {
                Dispatch::Ignored
            } else {
                Dispatch::Triggered { commands: fired }
            });
        };

        self.run_prefixed(&event, rest, &prefix).await
    }

    async fn run_prefixed(
        &self,
        event: &InboundEvent,
        rest: &str,
        prefix: &str,
    ) -> Result<Dispatch> {
        let mut tokens = rest.split_whitespace();
        let name = tokens.next().unwrap_or_default().to_lowercase();
        let args: Vec<String> = tokens.map(str::to_string).collect();

        if let Err(denied) = self.standing(event).await? {
            return Ok(self.deny(event, denied).await);
        }

        let Some(command) = self.registry.resolve(&name) else {
            debug!(thread_id = %event.thread_id, command = %name, "command not installed");
            self.notify(event, &notice::not_installed(&name, prefix)).await;
            return Ok(Dispatch::NotInstalled { name });
        };

        let handler = match command.invocation() {
            Invocation::Prefixed(handler) => Arc::clone(handler),
            Invocation::ChatOnly => {
                self.notify(event, &notice::wrong_convention(command.name()))
                    .await;
                return Ok(Dispatch::WrongConvention {
                    name: command.name().to_string(),
                });
            },
        };

        let descriptor = command.descriptor();
        let policy = self.policy.snapshot();
        if let Err(denied) = guard::check_permission(
            self.client.as_ref(),
            &policy,
            descriptor.permission,
            &event.sender_id,
            &event.thread_id,
        )
        .await
        {
            return Ok(self.deny(event, denied).await);
        }

        if let Err(denied) = guard::enforce_cooldown(
            self.store.as_ref(),
            descriptor,
            &event.sender_id,
            self.clock.now_ms(),
        )
        .await?
        {
            return Ok(self.deny(event, denied).await);
        }

        let ctx = self.context(event, command, args, prefix);

        if let Some(on_load) = command.on_load()
            && !self
                .invoke(event, command.name(), on_load.as_ref(), ctx.clone())
                .await
        {
            return Ok(Dispatch::Failed {
                command: command.name().to_string(),
            });
        }

        let delay = self.pacing_delay();
        if !delay.is_zero() {
            debug!(command = %command.name(), delay_ms = delay.as_millis() as u64, "pacing");
            tokio::time::sleep(delay).await;
        }

        // Bans or admin-only mode may have changed during the delay.
        if let Err(denied) = self.standing(event).await? {
            return Ok(self.deny(event, denied).await);
        }

        info!(
            thread_id = %event.thread_id,
            sender_id = %event.sender_id,
            command = %command.name(),
            args = ctx.args.len(),
            "running command"
        );
        if self
            .invoke(event, command.name(), handler.as_ref(), ctx)
            .await
        {
            Ok(Dispatch::Executed {
                command: command.name().to_string(),
            })
        } else {
            Ok(Dispatch::Failed {
                command: command.name().to_string(),
            })
        }
    }

    async fn standing(&self, event: &InboundEvent) -> Result<guard::Verdict> {
        let policy = self.policy.snapshot();
        guard::check_standing(
            self.store.as_ref(),
            &policy,
            &event.sender_id,
            &event.thread_id,
        )
        .await
    }

    async fn deny(&self, event: &InboundEvent, denied: AccessDenied) -> Dispatch {
        info!(
            thread_id = %event.thread_id,
            sender_id = %event.sender_id,
            reason = ?denied,
            "access denied"
        );
        self.notify(event, &denied.to_string()).await;
        Dispatch::Denied(denied)
    }

    /// Run one entry point. Returns `false` if it failed; the failure has
    /// already been logged and reported.
    async fn invoke(
        &self,
        event: &InboundEvent,
        command: &str,
        handler: &dyn CommandHandler,
        ctx: CommandContext,
    ) -> bool {
        match handler.call(ctx).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    thread_id = %event.thread_id,
                    sender_id = %event.sender_id,
                    command,
                    error = %e,
                    "command failed"
                );
                self.notify(event, &notice::command_failed(command)).await;
                false
            },
        }
    }

    /// Reply to the triggering message; delivery failures are only logged.
    async fn notify(&self, event: &InboundEvent, text: &str) {
        if let Err(e) = self
            .client
            .send_message(text, &event.thread_id, Some(&event.message_id))
            .await
        {
            warn!(thread_id = %event.thread_id, error = %e, "failed to send notice");
        }
    }

    fn context(
        &self,
        event: &InboundEvent,
        command: &Arc<Command>,
        args: Vec<String>,
        prefix: &str,
    ) -> CommandContext {
        CommandContext::new(
            Arc::clone(&self.client),
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            self.policy.clone(),
            Arc::clone(&self.registry),
            self.correlator.clone(),
            Arc::clone(command),
            event.clone(),
            args,
            prefix.to_string(),
        )
    }

    async fn thread_prefix(&self, thread_id: &str) -> String {
        match self.store.group_prefix(thread_id).await {
            Ok(Some(prefix)) => prefix,
            Ok(None) => self.config.prefix.clone(),
            Err(e) => {
                warn!(thread_id, error = %e, "prefix lookup failed, using default");
                self.config.prefix.clone()
            },
        }
    }

    fn pacing_delay(&self) -> Duration {
        let pacing = &self.config.pacing;
        let ms = if pacing.max_ms > pacing.min_ms {
            rand::rng().random_range(pacing.min_ms..=pacing.max_ms)
        } else {
            pacing.min_ms
        };
        Duration::from_millis(ms)
    }

    /// Fetch sender and thread metadata in the background and store it.
    fn refresh_metadata(&self, event: &InboundEvent) {
        if event.sender_id.is_empty() || event.thread_id.is_empty() {
            return;
        }
        let client = Arc::clone(&self.client);
        let store = Arc::clone(&self.store);
        let sender_id = event.sender_id.clone();
        let thread_id = event.thread_id.clone();
        tokio::spawn(async move {
            match client.get_user_info(&sender_id).await {
                Ok(info) => {
                    let record = UserRecord { name: info.name };
                    if let Err(e) = store.set_user(&sender_id, record).await {
                        warn!(sender_id, error = %e, "failed to store user");
                    }
                },
                Err(e) => warn!(sender_id, error = %e, "user info lookup failed"),
            }
            match client.get_thread_info(&thread_id).await {
                Ok(info) => {
                    let record = GroupRecord {
                        name: info.name,
                        prefix: None,
                    };
                    if let Err(e) = store.set_group(&thread_id, record).await {
                        warn!(thread_id, error = %e, "failed to store thread");
                    }
                },
                Err(e) => warn!(thread_id, error = %e, "thread info lookup failed"),
            }
        });
    }
}
