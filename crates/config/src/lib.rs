//! Configuration loading, env overrides, validation, and credential files.
//!
//! Config files: `chorus.toml`, `chorus.yaml`, `chorus.yml`, or `chorus.json`,
//! searched in `./` then `~/.config/chorus/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod credentials;
pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    credentials::{Account, Credentials},
    error::{Error, Result},
    loader::{apply_env_overrides, apply_env_overrides_with, discover_and_load, load_config},
    schema::{
        ChorusConfig, CredentialsConfig, GenerationConfig, KickConfig, ServerConfig,
        SessionConfig, SupervisorConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
