//! Maps message text to registered commands.

use std::sync::Arc;

use crate::{command::Command, registry::CommandRegistry};

/// A command whose unprefixed trigger matched a message.
#[derive(Debug, Clone)]
pub struct ChatTrigger<'a> {
    pub command: &'a Arc<Command>,
    pub args: Vec<String>,
}

/// Find the first command, in registration order, whose name or alias
/// matches `name` case-insensitively.
pub fn resolve<'a>(registry: &'a CommandRegistry, name: &str) -> Option<&'a Arc<Command>> {
    registry.iter().find(|c| c.descriptor().answers_to(name))
}

/// Every command with an unprefixed trigger matching `body`.
///
/// A command matches when the trimmed, lower-cased body equals its name or
/// starts with its name followed by a space. The remaining words become
/// the trigger's arguments.
pub fn chat_triggers<'a>(registry: &'a CommandRegistry, body: &str) -> Vec<ChatTrigger<'a>> {
    let body = body.trim();
    let lowered = body.to_lowercase();
    registry
        .iter()
        .filter(|c| c.on_chat().is_some())
        .filter_map(|command| {
            let name = command.name().to_lowercase();
            if lowered == name {
                return Some(ChatTrigger {
                    command,
                    args: Vec::new(),
                });
            }
            let rest = lowered.strip_prefix(&name)?.strip_prefix(' ')?;
            // Arguments keep their original casing when lower-casing did
            // not shift byte offsets.
            let source = if body.len() == lowered.len() {
                body.get(body.len() - rest.len()..).unwrap_or(rest)
            } else {
                rest
            };
            let args = source
                .split_whitespace()
                .map(str::to_string)
                .collect();
            Some(ChatTrigger { command, args })
        })
        .collect()
}
