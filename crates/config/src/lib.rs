//! Configuration loading, env substitution, and validation.
//!
//! Config files: `courier.toml`, `courier.yaml`, or `courier.json`
//! Searched in `./` then the user config directory.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        AccessConfig, CourierConfig, LoggingConfig, PacingConfig, RepliesConfig, StoreConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
