//! Event and platform metadata types shared by all courier crates.

pub mod types;
