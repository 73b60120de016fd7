use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::GuildbotConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "guildbot.toml",
    "guildbot.yaml",
    "guildbot.yml",
    "guildbot.json",
];

/// Env vars overriding `bot.prefix`, highest precedence first.
const PREFIX_VARS: &[&str] = &["GUILDBOT_PREFIX", "PREFIX"];

/// Env vars overriding `bot.owner_id`, highest precedence first.
const OWNER_VARS: &[&str] = &["GUILDBOT_OWNER_ID", "BOT_OWNER_ID"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<GuildbotConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./guildbot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/guildbot/guildbot.{toml,yaml,yml,json}` (user-global)
///
/// Returns `GuildbotConfig::default()` if no config file is found or the one
/// found cannot be loaded.
pub fn discover_and_load() -> GuildbotConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    GuildbotConfig::default()
}

/// Load an explicitly requested file (errors are fatal) or fall back to
/// discovery. Env overrides are applied in both cases.
pub fn load_or_discover(path: Option<&Path>) -> anyhow::Result<GuildbotConfig> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => discover_and_load(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Find the first config file in standard locations.
pub(crate) fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/guildbot/`).
pub(crate) fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "guildbot").map(|d| d.config_dir().to_path_buf())
}

/// Override prefix and owner from the process environment.
pub fn apply_env_overrides(config: &mut GuildbotConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut GuildbotConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some((var, prefix)) = first_set(PREFIX_VARS, &lookup) {
        debug!(var, "prefix overridden from environment");
        config.bot.prefix = prefix;
    }
    if let Some((var, owner)) = first_set(OWNER_VARS, &lookup) {
        debug!(var, "owner overridden from environment");
        config.bot.owner_id = Some(owner.trim().to_string());
    }
}

/// First variable in `vars` that is set to a non-blank value.
fn first_set(
    vars: &[&'static str],
    lookup: &impl Fn(&str) -> Option<String>,
) -> Option<(&'static str, String)> {
    vars.iter().find_map(|name| {
        lookup(name)
            .filter(|v| !v.trim().is_empty())
            .map(|v| (*name, v))
    })
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<GuildbotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
