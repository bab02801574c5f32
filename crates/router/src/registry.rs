use std::sync::Arc;

use tracing::{debug, warn};

use crate::{command::Command, resolver};

/// Ordered set of loaded commands. Registration order decides which
/// command wins when names or aliases collide.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: Command) {
        let descriptor = command.descriptor();
        let clashes: Vec<&str> = std::iter::once(descriptor.name.as_str())
            .chain(descriptor.aliases.iter().map(String::as_str))
            .filter(|key| self.resolve(key).is_some())
            .collect();
        if !clashes.is_empty() {
            warn!(
                command = %descriptor.name,
                clashes = ?clashes,
                "command name already taken, earlier registration wins"
            );
        }
        debug!(command = %descriptor.name, aliases = ?descriptor.aliases, "command registered");
        self.commands.push(Arc::new(command));
    }

    #[must_use]
    pub fn with(mut self, command: Command) -> Self {
        self.register(command);
        self
    }

    /// See [`resolver::resolve`].
    pub fn resolve(&self, name: &str) -> Option<&Arc<Command>> {
        resolver::resolve(self, name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Command>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{command::CommandDescriptor, test_support::noop},
    };

    #[test]
    fn keeps_registration_order() {
        let registry = CommandRegistry::new()
            .with(Command::prefixed(CommandDescriptor::new("b"), noop).build().unwrap())
            .with(Command::prefixed(CommandDescriptor::new("a"), noop).build().unwrap());
        let names: Vec<&str> = registry.iter().map(|c| c.name()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn first_registration_wins_on_clash() {
        let registry = CommandRegistry::new()
            .with(
                Command::prefixed(CommandDescriptor::new("help").description("first"), noop)
                    .build()
                    .unwrap(),
            )
            .with(
                Command::prefixed(CommandDescriptor::new("HELP").description("second"), noop)
                    .build()
                    .unwrap(),
            );
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.resolve("help").unwrap().descriptor().description, "first");
    }
}
