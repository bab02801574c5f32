//! Commands that ship with the binary.

use {
    anyhow::Context as _,
    courier_channels::GroupRecord,
    courier_common::types::InboundEvent,
    courier_router::{
        Command, CommandContext, CommandDescriptor, CommandRegistry, Invocation, Permission,
    },
    rand::Rng,
    serde_json::json,
};

pub fn registry() -> courier_router::Result<CommandRegistry> {
    let mut registry = CommandRegistry::new();
    registry.register(
        Command::prefixed(
            CommandDescriptor::new("help")
                .description("List commands or show details for one")
                .usage("help [command]"),
            help,
        )
        .build()?,
    );
    registry.register(
        Command::prefixed(
            CommandDescriptor::new("ping")
                .alias("p")
                .cooldown_secs(5)
                .description("Check that the bot is alive"),
            ping,
        )
        .build()?,
    );
    registry.register(
        Command::prefixed(
            CommandDescriptor::new("prefix")
                .permission(Permission::ThreadAdmin)
                .description("Change the command prefix of this thread")
                .usage("prefix <new prefix>"),
            set_prefix,
        )
        .build()?,
    );
    registry.register(
        Command::prefixed(
            CommandDescriptor::new("adminonly")
                .permission(Permission::BotAdmin)
                .description("Restrict the bot to admins")
                .usage("adminonly [on|off]"),
            admin_only,
        )
        .build()?,
    );
    registry.register(
        Command::prefixed(
            CommandDescriptor::new("ban")
                .permission(Permission::BotAdmin)
                .description("Ban a user from the bot")
                .usage("ban <user id> [reason]"),
            ban,
        )
        .build()?,
    );
    registry.register(
        Command::prefixed(
            CommandDescriptor::new("unban")
                .permission(Permission::BotAdmin)
                .description("Lift a user ban")
                .usage("unban <user id>"),
            unban,
        )
        .build()?,
    );
    registry.register(
        Command::prefixed(
            CommandDescriptor::new("guess")
                .cooldown_secs(3)
                .description("Guess the number I am thinking of"),
            guess,
        )
        .on_reply(check_guess)
        .build()?,
    );
    registry.register(
        Command::chat_only(CommandDescriptor::new("hello").description("Say hello"))
            .on_chat(hello)
            .build()?,
    );
    Ok(registry)
}

/// One line per command, in registration order.
pub fn help_text(registry: &CommandRegistry, prefix: &str, bot_name: &str) -> String {
    let mut out = format!("{bot_name} commands:");
    for command in registry.iter() {
        let descriptor = command.descriptor();
        let invoked = match command.invocation() {
            Invocation::Prefixed(_) => format!("{prefix}{}", descriptor.name),
            Invocation::ChatOnly => descriptor.name.clone(),
        };
        out.push_str(&format!("\n  {invoked}"));
        if !descriptor.description.is_empty() {
            out.push_str(&format!(" - {}", descriptor.description));
        }
    }
    out.push_str(&format!("\nType {prefix}help <command> for details."));
    out
}

pub fn command_help(command: &Command, prefix: &str) -> String {
    let descriptor = command.descriptor();
    let mut out = descriptor.name.clone();
    if !descriptor.description.is_empty() {
        out.push_str(&format!(": {}", descriptor.description));
    }
    let usage = descriptor.usage.as_deref().unwrap_or(&descriptor.name);
    match command.invocation() {
        Invocation::Prefixed(_) => out.push_str(&format!("\nUsage: {prefix}{usage}")),
        Invocation::ChatOnly => out.push_str(&format!("\nUsage: {usage} (no prefix)")),
    }
    if !descriptor.aliases.is_empty() {
        out.push_str(&format!("\nAliases: {}", descriptor.aliases.join(", ")));
    }
    match descriptor.permission {
        Permission::Public => {},
        Permission::BotAdmin => out.push_str("\nBot admins only"),
        Permission::ThreadAdmin => out.push_str("\nGroup admins only"),
    }
    if let Some(secs) = descriptor.cooldown() {
        out.push_str(&format!("\nCooldown: {secs}s"));
    }
    out
}

async fn help(ctx: CommandContext) -> anyhow::Result<()> {
    let text = match ctx.arg(0) {
        Some(name) => match ctx.registry.resolve(name) {
            Some(command) => command_help(command, &ctx.prefix),
            None => format!("No command named \"{name}\"."),
        },
        None => help_text(&ctx.registry, &ctx.prefix, &ctx.config.bot_name),
    };
    ctx.reply(&text).await?;
    Ok(())
}

async fn ping(ctx: CommandContext) -> anyhow::Result<()> {
    ctx.reply("pong").await?;
    Ok(())
}

async fn set_prefix(ctx: CommandContext) -> anyhow::Result<()> {
    let Some(prefix) = ctx.arg(0) else {
        ctx.reply(&format!("Current prefix: {}", ctx.prefix)).await?;
        return Ok(());
    };
    ctx.store
        .set_group(ctx.thread_id(), GroupRecord {
            name: None,
            prefix: Some(prefix.to_string()),
        })
        .await?;
    ctx.reply(&format!("Prefix changed to {prefix}")).await?;
    Ok(())
}

async fn admin_only(ctx: CommandContext) -> anyhow::Result<()> {
    let enabled = match ctx.arg(0).map(str::to_lowercase).as_deref() {
        Some("on") => true,
        Some("off") => false,
        None => !ctx.policy.snapshot().admin_only,
        Some(other) => {
            ctx.reply(&format!("Expected on or off, got \"{other}\"."))
                .await?;
            return Ok(());
        },
    };
    ctx.policy.set_admin_only(enabled);
    let state = if enabled { "on" } else { "off" };
    ctx.reply(&format!("Admin-only mode is {state}.")).await?;
    Ok(())
}

async fn ban(ctx: CommandContext) -> anyhow::Result<()> {
    let Some(user_id) = ctx.arg(0) else {
        ctx.reply(&format!("Usage: {}ban <user id> [reason]", ctx.prefix))
            .await?;
        return Ok(());
    };
    let reason = match ctx.rest(1) {
        r if r.is_empty() => "no reason given".to_string(),
        r => r,
    };
    ctx.store.ban_user(user_id, &reason).await?;
    ctx.reply(&format!("Banned {user_id}: {reason}")).await?;
    Ok(())
}

async fn unban(ctx: CommandContext) -> anyhow::Result<()> {
    let user_id = ctx.arg(0).context("missing user id")?;
    let text = if ctx.store.unban_user(user_id).await? {
        format!("Unbanned {user_id}.")
    } else {
        format!("{user_id} was not banned.")
    };
    ctx.reply(&text).await?;
    Ok(())
}

fn guess_key(ctx: &CommandContext) -> String {
    format!("guess_{}_{}", ctx.thread_id(), ctx.sender_id())
}

async fn guess(ctx: CommandContext) -> anyhow::Result<()> {
    let secret: u8 = rand::rng().random_range(1..=10);
    ctx.store.set(&guess_key(&ctx), json!(secret)).await?;
    ctx.send_awaiting_reply(
        "I'm thinking of a number between 1 and 10. Reply to this message with your guess.",
    )
    .await?;
    Ok(())
}

async fn check_guess(ctx: CommandContext, reply: InboundEvent) -> anyhow::Result<()> {
    let key = guess_key(&ctx);
    let secret = ctx
        .store
        .get(&key)
        .await?
        .and_then(|v| v.as_u64())
        .context("no number in play")?;
    let text = match reply.text().parse::<u64>() {
        Ok(n) if n == secret => format!("{n} is right!"),
        Ok(n) => format!("{n} is wrong, it was {secret}."),
        Err(_) => format!("\"{}\" is not a number, it was {secret}.", reply.text()),
    };
    ctx.client
        .send_message(&text, &reply.thread_id, Some(&reply.message_id))
        .await?;
    Ok(())
}

async fn hello(ctx: CommandContext) -> anyhow::Result<()> {
    let name = ctx
        .client
        .get_user_info(ctx.sender_id())
        .await
        .map(|u| u.name)
        .unwrap_or_else(|_| ctx.sender_id().to_string());
    ctx.reply(&format!("Hello, {name}!")).await?;
    Ok(())
}
