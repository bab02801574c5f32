//! Command descriptors and the handler traits commands implement.

use std::{fmt, future::Future, sync::Arc};

use {
    async_trait::async_trait,
    courier_common::types::InboundEvent,
    serde::{Deserialize, Serialize},
};

use crate::{
    context::CommandContext,
    error::{Error, Result},
};

/// Access tier required to run a prefixed command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    #[default]
    Public,
    /// Listed in the configured bot admin IDs.
    BotAdmin,
    /// Participant and admin of the thread the command was sent in.
    ThreadAdmin,
}

/// Static metadata of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub permission: Permission,
    /// Whole seconds between two uses by the same sender.
    pub cooldown_secs: Option<u64>,
    pub description: String,
    pub usage: Option<String>,
}

impl CommandDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            permission: Permission::Public,
            cooldown_secs: None,
            description: String::new(),
            usage: None,
        }
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    #[must_use]
    pub fn cooldown_secs(mut self, secs: u64) -> Self {
        self.cooldown_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    /// Cooldown in seconds, `None` when unset or zero.
    pub fn cooldown(&self) -> Option<u64> {
        self.cooldown_secs.filter(|secs| *secs > 0)
    }

    /// Case-insensitive match on the name or any alias.
    pub fn answers_to(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.name.to_lowercase() == name || self.aliases.iter().any(|a| a.to_lowercase() == name)
    }
}

/// An entry point that receives the invocation context.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, ctx: CommandContext) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(&self, ctx: CommandContext) -> anyhow::Result<()> {
        (self)(ctx).await
    }
}

/// Handles a follow-up reply to a message the command sent.
#[async_trait]
pub trait ReplyHandler: Send + Sync {
    async fn call(&self, ctx: CommandContext, reply: InboundEvent) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> ReplyHandler for F
where
    F: Fn(CommandContext, InboundEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(&self, ctx: CommandContext, reply: InboundEvent) -> anyhow::Result<()> {
        (self)(ctx, reply).await
    }
}

/// How a command is reached through the prefix.
#[derive(Clone)]
pub enum Invocation {
    /// `{prefix}name args` runs the handler.
    Prefixed(Arc<dyn CommandHandler>),
    /// Only reachable through its unprefixed trigger.
    ChatOnly,
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prefixed(_) => f.write_str("Prefixed"),
            Self::ChatOnly => f.write_str("ChatOnly"),
        }
    }
}

/// A registered command: descriptor plus its behaviour.
pub struct Command {
    descriptor: CommandDescriptor,
    invocation: Invocation,
    on_chat: Option<Arc<dyn CommandHandler>>,
    on_reply: Option<Arc<dyn ReplyHandler>>,
    on_load: Option<Arc<dyn CommandHandler>>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.descriptor.name)
            .field("invocation", &self.invocation)
            .field("on_chat", &self.on_chat.is_some())
            .field("on_reply", &self.on_reply.is_some())
            .field("on_load", &self.on_load.is_some())
            .finish()
    }
}

impl Command {
    /// A command run as `{prefix}name`.
    pub fn prefixed(
        descriptor: CommandDescriptor,
        handler: impl CommandHandler + 'static,
    ) -> CommandBuilder {
        CommandBuilder::new(descriptor, Invocation::Prefixed(Arc::new(handler)))
    }

    /// A command with no prefixed form; [`CommandBuilder::on_chat`] is required.
    pub fn chat_only(descriptor: CommandDescriptor) -> CommandBuilder {
        CommandBuilder::new(descriptor, Invocation::ChatOnly)
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub fn on_chat(&self) -> Option<&Arc<dyn CommandHandler>> {
        self.on_chat.as_ref()
    }

    pub fn on_reply(&self) -> Option<&Arc<dyn ReplyHandler>> {
        self.on_reply.as_ref()
    }

    pub fn on_load(&self) -> Option<&Arc<dyn CommandHandler>> {
        self.on_load.as_ref()
    }
}

pub struct CommandBuilder {
    descriptor: CommandDescriptor,
    invocation: Invocation,
    on_chat: Option<Arc<dyn CommandHandler>>,
    on_reply: Option<Arc<dyn ReplyHandler>>,
    on_load: Option<Arc<dyn CommandHandler>>,
}

impl CommandBuilder {
    fn new(descriptor: CommandDescriptor, invocation: Invocation) -> Self {
        Self {
            descriptor,
            invocation,
            on_chat: None,
            on_reply: None,
            on_load: None,
        }
    }

    /// Fire on unprefixed messages that start with the command name.
    #[must_use]
    pub fn on_chat(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.on_chat = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn on_reply(mut self, handler: impl ReplyHandler + 'static) -> Self {
        self.on_reply = Some(Arc::new(handler));
        self
    }

    /// Runs after all access checks pass, right before the primary action.
    #[must_use]
    pub fn on_load(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.on_load = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Command> {
        let name = self.descriptor.name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(Error::invalid_command(
                &self.descriptor.name,
                "name must be a single non-empty word",
            ));
        }
        if matches!(self.invocation, Invocation::ChatOnly) && self.on_chat.is_none() {
            return Err(Error::invalid_command(
                &self.descriptor.name,
                "chat-only command needs an on_chat handler",
            ));
        }
        Ok(Command {
            descriptor: self.descriptor,
            invocation: self.invocation,
            on_chat: self.on_chat,
            on_reply: self.on_reply,
            on_load: self.on_load,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    async fn noop(_ctx: CommandContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn ignore_reply(_ctx: CommandContext, _reply: InboundEvent) -> anyhow::Result<()> {
        Ok(())
    }

    #[rstest]
    #[case("ping", true)]
    #[case("PING", true)]
    #[case("p", true)]
    #[case("P", true)]
    #[case("pong", false)]
    #[case("", false)]
    fn answers_to_name_and_aliases(#[case] input: &str, #[case] expected: bool) {
        let descriptor = CommandDescriptor::new("ping").alias("p");
        assert_eq!(descriptor.answers_to(input), expected);
    }

    #[rstest]
    #[case("écho", true)]
    #[case("ÉCHO", true)]
    #[case("Ré", true)]
    #[case("echo", false)]
    fn answers_to_non_ascii_names(#[case] input: &str, #[case] expected: bool) {
        let descriptor = CommandDescriptor::new("Écho").alias("ré");
        assert_eq!(descriptor.answers_to(input), expected);
    }

    #[test]
    fn zero_cooldown_means_none() {
        assert_eq!(CommandDescriptor::new("x").cooldown(), None);
        assert_eq!(CommandDescriptor::new("x").cooldown_secs(0).cooldown(), None);
        assert_eq!(CommandDescriptor::new("x").cooldown_secs(3).cooldown(), Some(3));
    }

    #[test]
    fn chat_only_requires_trigger() {
        let err = Command::chat_only(CommandDescriptor::new("hello"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCommand { .. }), "got {err}");

        let command = Command::chat_only(CommandDescriptor::new("hello"))
            .on_chat(noop)
            .build()
            .unwrap();
        assert!(matches!(command.invocation(), Invocation::ChatOnly));
        assert!(command.on_chat().is_some());
    }

    #[rstest]
    #[case("")]
    #[case("two words")]
    fn rejects_malformed_names(#[case] name: &str) {
        assert!(Command::prefixed(CommandDescriptor::new(name), noop).build().is_err());
    }

    #[test]
    fn prefixed_command_keeps_hooks() {
        let command = Command::prefixed(CommandDescriptor::new("quiz"), noop)
            .on_load(noop)
            .on_reply(ignore_reply)
            .build()
            .unwrap();
        assert_eq!(command.name(), "quiz");
        assert!(command.on_load().is_some());
        assert!(command.on_reply().is_some());
        assert!(command.on_chat().is_none());
    }
}
