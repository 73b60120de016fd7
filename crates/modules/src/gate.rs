use {async_trait::async_trait, guildbot_common::ChatMessage};

/// Per-guild module activation state.
///
/// Implementations own the state; dispatch only reads it and never caches a
/// result across calls.
#[async_trait]
pub trait ActivationGate: Send + Sync {
    /// Names of the modules switched off for `guild_id`.
    async fn disabled_modules(&self, guild_id: &str) -> anyhow::Result<Vec<String>>;
}

/// Resolves who may run privileged commands in a guild.
#[async_trait]
pub trait PermissionResolver: Send + Sync {
    /// The guild's moderator role ID, or the guild owner's user ID when no
    /// role is bound. `None` when neither is known.
    async fn privileged_role_or_owner(&self, guild_id: &str) -> anyhow::Result<Option<String>>;
}

/// Decide whether the author of `message` may run a privileged command.
///
/// Any one of these suffices: the author is the bot owner, the author's ID is
/// the binding itself (guild owner fallback), or the author holds the bound
/// role.
pub fn is_authorized(owner_id: Option<&str>, message: &ChatMessage, binding: Option<&str>) -> bool {
    let author = message.author_id.as_str();
    if owner_id.is_some_and(|owner| owner == author) {
        return true;
    }
    binding.is_some_and(|binding| binding == author || message.has_role(binding))
}
