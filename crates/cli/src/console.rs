//! Line-oriented console adapter.
//!
//! Every stdin line becomes a [`ChatMessage`] from a fixed user and guild;
//! replies are written to stdout.

use std::{path::Path, sync::Arc};

use {
    async_trait::async_trait,
    guildbot_common::{ChatMessage, ReplyOutbound},
    guildbot_config::{GuildbotConfig, Severity, validate::validate_config},
    guildbot_modules::{
        DispatchSettings, MemoryStore, ModuleHub, Services, StaticGuildDirectory,
        StoreActivationGate, StorePermissionResolver,
    },
    tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    tracing::{error, info, warn},
};

use crate::{admin::AdminModule, echo::EchoModule};

#[derive(clap::Args)]
pub struct ConsoleArgs {
    /// Guild the messages are posted in.
    #[arg(long, default_value = "console")]
    guild: String,
    /// Sender's user ID.
    #[arg(long, default_value = "console-user")]
    user: String,
    /// Role IDs the sender holds (repeatable).
    #[arg(long = "role")]
    roles: Vec<String>,
    /// Send as direct messages instead of guild messages.
    #[arg(long, default_value_t = false)]
    dm: bool,
}

impl ConsoleArgs {
    fn message(&self, content: &str) -> ChatMessage {
        let message = ChatMessage::new(&self.user, content)
            .in_channel("console")
            .with_roles(self.roles.iter().cloned());
        if self.dm {
            message
        } else {
            message.in_guild(&self.guild)
        }
    }
}

/// Writes replies to stdout, one per line.
struct StdoutOutbound;

#[async_trait]
impl ReplyOutbound for StdoutOutbound {
    async fn reply(&self, message: &ChatMessage, text: &str) -> guildbot_common::Result<()> {
        let line = format!("<@{}> {text}\n", message.author_id);
        let mut out = tokio::io::stdout();
        let written = match out.write_all(line.as_bytes()).await {
            Ok(()) => out.flush().await,
            Err(e) => Err(e),
        };
        written.map_err(|e| guildbot_common::Error::delivery(&message.channel_id, e))
    }
}

pub async fn run(config_path: Option<&Path>, args: ConsoleArgs) -> anyhow::Result<()> {
    let config = guildbot_config::load_or_discover(config_path)?;

    let mut errors = 0;
    for d in validate_config(&config) {
        match d.severity {
            Severity::Error => {
                errors += 1;
                error!(path = %d.path, "{}", d.message);
            },
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => {},
        }
    }
    if errors > 0 {
        anyhow::bail!("refusing to start with {errors} configuration error(s)");
    }

    let hub = build_hub(&config, Arc::new(StdoutOutbound)).await?;
    info!(
        guild_id = %args.guild,
        user_id = %args.user,
        prefix = %hub.settings().prefix,
        "console ready, reading messages from stdin"
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let content = line.trim();
        if content.is_empty() {
            continue;
        }
        if let Err(e) = hub.dispatch(&args.message(content)).await {
            warn!(error = %e, "dispatch failed");
        }
    }
    Ok(())
}

/// Assemble the module chain over in-memory collaborators seeded from
/// `config`.
pub async fn build_hub(
    config: &GuildbotConfig,
    outbound: Arc<dyn ReplyOutbound>,
) -> anyhow::Result<ModuleHub> {
    let store = Arc::new(MemoryStore::new());
    let directory = Arc::new(StaticGuildDirectory::default());
    let gate = Arc::new(StoreActivationGate::new(store.clone()));
    let resolver = Arc::new(StorePermissionResolver::new(store, directory.clone()));

    let services = Services {
        gate: gate.clone(),
        permissions: resolver.clone(),
        outbound,
    };
    let hub = ModuleHub::builder(DispatchSettings::from_config(&config.bot), services)
        .module(AdminModule::new(gate.clone(), resolver.clone()))
        .module(EchoModule)
        .build()?;

    for (guild_id, guild) in &config.guilds {
        if let Some(owner) = &guild.owner_id {
            directory.insert(guild_id.as_str(), owner.as_str());
        }
        if let Some(role) = &guild.mod_role {
            resolver.set_privileged_role(guild_id, role).await?;
        }
        for module in &guild.disabled_modules {
            match hub.catalog().toggleable(module) {
                Ok(_) => {
                    gate.set_enabled(guild_id, module, false).await?;
                },
                Err(e) => {
                    warn!(
                        guild_id = %guild_id,
                        module = %module,
                        error = %e,
                        "ignoring disabled_modules entry"
                    );
                },
            }
        }
    }

    hub.initialize().await?;
    Ok(hub)
}
