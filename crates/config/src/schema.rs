/// Config schema types (bot settings and per-guild seed bindings).
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default command prefix.
pub const DEFAULT_PREFIX: &str = "_";

/// Default reply sent when a privileged command is refused.
pub const DEFAULT_DENIAL_MESSAGE: &str =
    "This command is only available to users with the role <@&{role}>.";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildbotConfig {
    pub bot: BotConfig,
    /// Per-guild bindings keyed by guild ID.
    pub guilds: BTreeMap<String, GuildConfig>,
}

/// Process-wide dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Prefix that marks a message as a command. Defaults to "_".
    pub prefix: String,
    /// User ID that may run every privileged command in every guild.
    pub owner_id: Option<String>,
    /// What to do with messages that have no guild.
    pub direct_messages: DirectMessagePolicy,
    /// Reply sent when a privileged command is refused. `{role}` is replaced
    /// with the required role or owner ID.
    pub denial_message: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.into(),
            owner_id: None,
            direct_messages: DirectMessagePolicy::default(),
            denial_message: DEFAULT_DENIAL_MESSAGE.into(),
        }
    }
}

/// Handling of direct (non-guild) messages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DirectMessagePolicy {
    /// The first module to see a direct message ends dispatch.
    #[default]
    Stop,
    /// Direct messages pass through every module untouched.
    Forward,
}

/// Seed values for one guild.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GuildConfig {
    /// Guild owner's user ID, used when no moderator role is bound.
    pub owner_id: Option<String>,
    /// Role allowed to run privileged commands.
    pub mod_role: Option<String>,
    /// Modules switched off for this guild.
    pub disabled_modules: Vec<String>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = GuildbotConfig::default();
        assert_eq!(cfg.bot.prefix, "_");
        assert_eq!(cfg.bot.direct_messages, DirectMessagePolicy::Stop);
        assert!(cfg.bot.denial_message.contains("{role}"));
        assert!(cfg.guilds.is_empty());
    }

    #[test]
    fn parses_guild_tables() {
        let cfg: GuildbotConfig = toml::from_str(
            r#"
[bot]
prefix = "!"
owner_id = "100"
direct_messages = "forward"

[guilds.g1]
mod_role = "r1"
disabled_modules = ["quotes"]
"#,
        )
        .unwrap();
        assert_eq!(cfg.bot.prefix, "!");
        assert_eq!(cfg.bot.owner_id.as_deref(), Some("100"));
        assert_eq!(cfg.bot.direct_messages, DirectMessagePolicy::Forward);
        let g1 = &cfg.guilds["g1"];
        assert_eq!(g1.mod_role.as_deref(), Some("r1"));
        assert_eq!(g1.disabled_modules, vec!["quotes".to_string()]);
        assert!(g1.owner_id.is_none());
    }
}
