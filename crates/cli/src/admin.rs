//! Built-in `admin` module: liveness, module listing, and per-guild
//! activation and moderator-role management.

use std::sync::{Arc, OnceLock};

use {
    async_trait::async_trait,
    guildbot_modules::{
        ActivationGate, CommandRegistry, InitContext, Invocation, Module, ModuleCatalog,
        StoreActivationGate, StorePermissionResolver, error::Context, handler_fn,
    },
    tracing::info,
};

pub const NAME: &str = "admin";

pub struct AdminModule {
    gate: Arc<StoreActivationGate>,
    resolver: Arc<StorePermissionResolver>,
    catalog: OnceLock<ModuleCatalog>,
}

impl AdminModule {
    pub fn new(gate: Arc<StoreActivationGate>, resolver: Arc<StorePermissionResolver>) -> Self {
        Self {
            gate,
            resolver,
            catalog: OnceLock::new(),
        }
    }
}

#[async_trait]
impl Module for AdminModule {
    fn name(&self) -> &str {
        NAME
    }

    fn always_activated(&self) -> bool {
        true
    }

    async fn init(&self, ctx: &InitContext) -> anyhow::Result<()> {
        self.catalog
            .set(ctx.catalog.clone())
            .map_err(|_| anyhow::anyhow!("admin catalog already set"))
    }

    fn register_commands(&self, commands: &mut CommandRegistry) -> guildbot_modules::Result<()> {
        let catalog = self
            .catalog
            .get()
            .cloned()
            .context("admin commands registered before init")?;

        commands.command("ping", handler_fn(ping))?;

        let (gate, listed) = (Arc::clone(&self.gate), catalog.clone());
        commands.command(
            "modules",
            handler_fn(move |inv| list_modules(inv, listed.clone(), Arc::clone(&gate))),
        )?;

        let (gate, toggled) = (Arc::clone(&self.gate), catalog.clone());
        commands.privileged(
            "enable",
            handler_fn(move |inv| set_enabled(inv, toggled.clone(), Arc::clone(&gate), true)),
        )?;

        let (gate, toggled) = (Arc::clone(&self.gate), catalog);
        commands.privileged(
            "disable",
            handler_fn(move |inv| set_enabled(inv, toggled.clone(), Arc::clone(&gate), false)),
        )?;

        let resolver = Arc::clone(&self.resolver);
        commands.privileged(
            "set-mod-role",
            handler_fn(move |inv| set_mod_role(inv, Arc::clone(&resolver))),
        )?;

        let resolver = Arc::clone(&self.resolver);
        commands.privileged(
            "clear-mod-role",
            handler_fn(move |inv| clear_mod_role(inv, Arc::clone(&resolver))),
        )?;

        Ok(())
    }
}

async fn ping(inv: Invocation) -> anyhow::Result<()> {
    inv.reply("pong").await?;
    Ok(())
}

async fn list_modules(
    inv: Invocation,
    catalog: ModuleCatalog,
    gate: Arc<StoreActivationGate>,
) -> anyhow::Result<()> {
    let disabled = gate.disabled_modules(inv.guild_id()).await?;
    let lines: Vec<String> = catalog
        .iter()
        .map(|m| {
            let state = if m.always_activated {
                "always on"
            } else if disabled.contains(&m.name) {
                "disabled"
            } else {
                "enabled"
            };
            format!("{} ({state})", m.name)
        })
        .collect();
    inv.reply(&format!("Modules: {}", lines.join(", "))).await?;
    Ok(())
}

async fn set_enabled(
    inv: Invocation,
    catalog: ModuleCatalog,
    gate: Arc<StoreActivationGate>,
    enabled: bool,
) -> anyhow::Result<()> {
    let verb = if enabled { "enable" } else { "disable" };
    let Some(name) = inv.args.first() else {
        inv.reply(&format!("Usage: {verb} <module>")).await?;
        return Ok(());
    };
    if let Err(e) = catalog.toggleable(name) {
        inv.reply(&format!("Cannot {verb} {name}: {e}.")).await?;
        return Ok(());
    }

    let changed = gate.set_enabled(inv.guild_id(), name, enabled).await?;
    let state = if enabled { "enabled" } else { "disabled" };
    if changed {
        info!(guild_id = inv.guild_id(), module = %name, enabled, "module toggled by command");
        inv.reply(&format!("Module {name} {state}.")).await?;
    } else {
        inv.reply(&format!("Module {name} is already {state}.")).await?;
    }
    Ok(())
}

async fn set_mod_role(inv: Invocation, resolver: Arc<StorePermissionResolver>) -> anyhow::Result<()> {
    let Some(role) = inv.args.first() else {
        inv.reply("Usage: set-mod-role <role-id>").await?;
        return Ok(());
    };
    resolver.set_privileged_role(inv.guild_id(), role).await?;
    inv.reply(&format!("Moderator role set to <@&{role}>.")).await?;
    Ok(())
}

async fn clear_mod_role(
    inv: Invocation,
    resolver: Arc<StorePermissionResolver>,
) -> anyhow::Result<()> {
    resolver.clear_privileged_role(inv.guild_id()).await?;
    inv.reply("Moderator role cleared; the guild owner is in charge again.")
        .await?;
    Ok(())
}
