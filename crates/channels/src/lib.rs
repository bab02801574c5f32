//! Collaborator interfaces consumed by the router.
//!
//! The chat platform is reached through [`ChatClient`]; users, threads,
//! bans and cooldown timestamps live behind [`AccessStore`]. Two store
//! implementations ship here: a process-local [`MemoryStore`] and a
//! [`JsonFileStore`] that persists every write to a single JSON document.

pub mod client;
pub mod error;
pub mod json_store;
pub mod memory;
pub mod store;

pub use {
    client::ChatClient,
    error::{Error, Result},
    json_store::JsonFileStore,
    memory::MemoryStore,
    store::{AccessStore, GroupRecord, StoreData, UserRecord},
};
