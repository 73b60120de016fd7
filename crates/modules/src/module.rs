use std::sync::Arc;

use {async_trait::async_trait, guildbot_common::ChatMessage};

use crate::{
    DispatchSettings, Result,
    command::CommandRegistry,
    hub::ModuleCatalog,
    next::{Dispatch, Next},
};

/// Identity of a module, fixed when its unit is constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    /// Unique name within a hub; the key used for activation lookups.
    pub name: String,
    /// Cannot be switched off per guild.
    pub always_activated: bool,
}

/// Handed to [`Module::init`].
#[derive(Debug, Clone)]
pub struct InitContext {
    /// Every module registered in the hub, in dispatch order.
    pub catalog: ModuleCatalog,
    pub settings: Arc<DispatchSettings>,
}

/// A routing unit implemented by feature code.
///
/// The unit wrapping a module takes care of guild gating, command parsing and
/// permission checks; the module only declares commands and, optionally,
/// reacts to messages that are not commands.
#[async_trait]
pub trait Module: Send + Sync {
    /// Module name (e.g. "admin", "quotes").
    fn name(&self) -> &str;

    /// Whether guilds may switch this module off. Defaults to `false`.
    fn always_activated(&self) -> bool {
        false
    }

    /// One-time setup, run before commands are registered.
    async fn init(&self, _ctx: &InitContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Declare this module's commands. Called exactly once, after `init`.
    fn register_commands(&self, _commands: &mut CommandRegistry) -> Result<()> {
        Ok(())
    }

    /// React to a guild message that is not one of this module's commands.
    ///
    /// The default passes the message on. An override that wants later
    /// modules to see the message must run `next`; returning without doing so
    /// ends dispatch.
    async fn handle(&self, _message: &ChatMessage, next: Next<'_>) -> Result<Dispatch> {
        next.run().await
    }
}
