//! Configuration loading, validation, and env substitution.
//!
//! Config files: `guildbot.toml`, `guildbot.yaml`, or `guildbot.json`
//! Searched in `./` then `~/.config/guildbot/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file text.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{apply_env_overrides, discover_and_load, load_config, load_or_discover},
    schema::{BotConfig, DirectMessagePolicy, GuildConfig, GuildbotConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
