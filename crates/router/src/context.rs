use std::sync::Arc;

use {
    anyhow::Context as _,
    courier_channels::{AccessStore, ChatClient},
    courier_common::types::{InboundEvent, SentMessage},
    courier_config::CourierConfig,
    tracing::warn,
};

use crate::{
    command::{Command, ReplyHandler},
    correlator::{ListenOptions, ReplyCorrelator},
    guard::SharedPolicy,
    notice,
    registry::CommandRegistry,
};

/// Everything a command entry point gets to work with.
#[derive(Clone)]
pub struct CommandContext {
    pub client: Arc<dyn ChatClient>,
    pub store: Arc<dyn AccessStore>,
    pub config: Arc<CourierConfig>,
    pub policy: SharedPolicy,
    pub registry: Arc<CommandRegistry>,
    /// The event that triggered this invocation.
    pub event: InboundEvent,
    pub args: Vec<String>,
    /// Effective prefix of the thread the event came from.
    pub prefix: String,
    command: Arc<Command>,
    correlator: ReplyCorrelator,
}

impl CommandContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        client: Arc<dyn ChatClient>,
        store: Arc<dyn AccessStore>,
        config: Arc<CourierConfig>,
        policy: SharedPolicy,
        registry: Arc<CommandRegistry>,
        correlator: ReplyCorrelator,
        command: Arc<Command>,
        event: InboundEvent,
        args: Vec<String>,
        prefix: String,
    ) -> Self {
        Self {
            client,
            store,
            config,
            policy,
            registry,
            event,
            args,
            prefix,
            command,
            correlator,
        }
    }

    pub fn command_name(&self) -> &str {
        self.command.name()
    }

    pub fn sender_id(&self) -> &str {
        &self.event.sender_id
    }

    pub fn thread_id(&self) -> &str {
        &self.event.thread_id
    }

    /// Positional argument, if present.
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Arguments from `start` on, joined by single spaces.
    pub fn rest(&self, start: usize) -> String {
        self.args.get(start..).map(|a| a.join(" ")).unwrap_or_default()
    }

    /// Send `text` to the thread, quoting the triggering message.
    pub async fn reply(&self, text: &str) -> anyhow::Result<SentMessage> {
        self.client
            .send_message(text, &self.event.thread_id, Some(&self.event.message_id))
            .await
    }

    /// Send `text` to the thread without quoting.
    pub async fn send(&self, text: &str) -> anyhow::Result<SentMessage> {
        self.client
            .send_message(text, &self.event.thread_id, None)
            .await
    }

    /// Send `text` and route replies to it into this command's reply
    /// handler, using the configured timeout and ignoring empty replies.
    pub async fn send_awaiting_reply(&self, text: &str) -> anyhow::Result<SentMessage> {
        let options = ListenOptions::default()
            .timeout(self.config.replies.timeout())
            .non_empty_body();
        self.send_awaiting_reply_with(text, options).await
    }

    pub async fn send_awaiting_reply_with(
        &self,
        text: &str,
        options: ListenOptions,
    ) -> anyhow::Result<SentMessage> {
        let handler: Arc<dyn ReplyHandler> = self
            .command
            .on_reply()
            .cloned()
            .with_context(|| format!("command '{}' has no reply handler", self.command_name()))?;

        let sent = self.send(text).await?;

        let ctx = self.clone();
        self.correlator.register(
            sent.message_id.clone(),
            move |reply: InboundEvent| {
                let handler = Arc::clone(&handler);
                let ctx = ctx.clone();
                async move {
                    let result = handler.call(ctx.clone(), reply.clone()).await;
                    if result.is_err() {
                        let text = notice::command_failed(ctx.command_name());
                        if let Err(e) = ctx
                            .client
                            .send_message(&text, &reply.thread_id, Some(&reply.message_id))
                            .await
                        {
                            warn!(thread_id = %reply.thread_id, error = %e, "failed to send failure notice");
                        }
                    }
                    result
                }
            },
            options,
        );
        Ok(sent)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{
            command::CommandDescriptor,
            test_support::{MockClient, context_for, noop},
        },
    };

    async fn echo_answer(ctx: CommandContext, reply: InboundEvent) -> anyhow::Result<()> {
        if reply.text() == "fail" {
            anyhow::bail!("bad answer");
        }
        ctx.send(&format!("you said {}", reply.text())).await?;
        Ok(())
    }

    fn quiz() -> Arc<Command> {
        Arc::new(
            Command::prefixed(CommandDescriptor::new("quiz"), noop)
                .on_reply(echo_answer)
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn reply_quotes_the_trigger() {
        let client = Arc::new(MockClient::default());
        let (ctx, _) = context_for(client.clone(), quiz(), "!quiz a b c");
        ctx.reply("hi").await.unwrap();

        let sent = client.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].reply_to.as_deref(), Some("m1"));
        assert_eq!(ctx.rest(1), "b c");
        assert_eq!(ctx.arg(0), Some("a"));
        assert_eq!(ctx.arg(9), None);
        assert_eq!(ctx.rest(7), "");
    }

    #[tokio::test]
    async fn follow_up_reaches_reply_handler() {
        let client = Arc::new(MockClient::default());
        let (ctx, correlator) = context_for(client.clone(), quiz(), "!quiz");
        let sent = ctx.send_awaiting_reply("pick a number").await.unwrap();
        assert!(correlator.contains(&sent.message_id));

        let blank = InboundEvent::message("t1", "u1", "m9", " ").replying_to(&sent.message_id);
        assert!(!correlator.resolve(&sent.message_id, &blank).await);

        let answer = InboundEvent::message("t1", "u1", "m10", "7").replying_to(&sent.message_id);
        assert!(correlator.resolve(&sent.message_id, &answer).await);
        assert!(!correlator.contains(&sent.message_id));
        assert_eq!(client.sent().last().unwrap().text, "you said 7");
    }

    #[tokio::test]
    async fn failing_reply_handler_sends_notice() {
        let client = Arc::new(MockClient::default());
        let (ctx, correlator) = context_for(client.clone(), quiz(), "!quiz");
        let sent = ctx.send_awaiting_reply("pick").await.unwrap();

        let answer = InboundEvent::message("t1", "u1", "m10", "fail").replying_to(&sent.message_id);
        assert!(correlator.resolve(&sent.message_id, &answer).await);
        let last = client.sent().last().cloned().unwrap();
        assert!(last.text.contains("quiz"), "{}", last.text);
        assert_eq!(last.reply_to.as_deref(), Some("m10"));
    }

    #[tokio::test]
    async fn awaiting_reply_needs_a_handler() {
        let client = Arc::new(MockClient::default());
        let command = Arc::new(
            Command::prefixed(CommandDescriptor::new("ping"), noop)
                .build()
                .unwrap(),
        );
        let (ctx, correlator) = context_for(client.clone(), command, "!ping");
        assert!(ctx.send_awaiting_reply("hello?").await.is_err());
        assert!(client.sent().is_empty());
        assert!(correlator.is_empty());
    }
}
