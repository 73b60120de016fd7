use guildbot_config::{BotConfig, DirectMessagePolicy};

/// Placeholder in the denial template replaced with the required role.
const ROLE_PLACEHOLDER: &str = "{role}";

/// Process-wide dispatch settings, resolved once at startup and shared by
/// every unit in a hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Command prefix, e.g. "_".
    pub prefix: String,
    /// Bot owner; passes every privileged check in every guild.
    pub owner_id: Option<String>,
    pub direct_messages: DirectMessagePolicy,
    /// Denial reply template with a `{role}` placeholder.
    pub denial_template: String,
}

impl DispatchSettings {
    pub fn from_config(bot: &BotConfig) -> Self {
        Self {
            prefix: bot.prefix.clone(),
            owner_id: bot.owner_id.clone(),
            direct_messages: bot.direct_messages,
            denial_template: bot.denial_message.clone(),
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    #[must_use]
    pub fn with_direct_messages(mut self, policy: DirectMessagePolicy) -> Self {
        self.direct_messages = policy;
        self
    }

    /// Render the denial reply for `role`.
    pub fn denial_message(&self, role: &str) -> String {
        self.denial_template.replace(ROLE_PLACEHOLDER, role)
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&BotConfig::default())
    }
}
