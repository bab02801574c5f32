use std::error::Error as StdError;

/// Typed router errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A command was assembled with an inconsistent shape.
    #[error("invalid command '{name}': {message}")]
    InvalidCommand { name: String, message: String },

    /// A store lookup or write failed while deciding access.
    #[error("store operation failed: {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error(transparent)]
    Channel(#[from] courier_channels::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_command(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidCommand {
            name: name.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn store(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Store {
            context: context.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
