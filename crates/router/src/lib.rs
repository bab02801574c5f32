//! Reply correlation and command dispatch for a chat bot.
//!
//! Flow: inbound event → [`Router::handle_event`] → reply correlation
//! short-circuit → access guard → command resolution → command handler.

pub mod clock;
pub mod command;
pub mod context;
pub mod correlator;
pub mod error;
pub mod guard;
pub mod notice;
pub mod pipeline;
pub mod registry;
pub mod resolver;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
pub(crate) mod test_support;

pub use {
    clock::{Clock, ManualClock, SystemClock},
    command::{
        Command, CommandBuilder, CommandDescriptor, CommandHandler, Invocation, Permission,
        ReplyHandler,
    },
    context::CommandContext,
    correlator::{ListenOptions, ReplyCorrelator},
    error::{Error, Result},
    guard::{AccessDenied, AccessPolicy, SharedPolicy},
    pipeline::{Dispatch, Router},
    registry::CommandRegistry,
};
