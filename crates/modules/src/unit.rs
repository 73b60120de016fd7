use std::sync::{
    Arc, OnceLock,
    atomic::{AtomicBool, Ordering},
};

use {
    guildbot_common::ChatMessage,
    guildbot_config::DirectMessagePolicy,
    tracing::{debug, info, warn},
};

use crate::{
    DispatchSettings, Error, Result,
    command::{Command, CommandLine, CommandRegistry, CommandTable, Invocation, parse_command_line},
    gate::is_authorized,
    hub::Services,
    module::{InitContext, Module, ModuleDescriptor},
    next::{Dispatch, Next},
};

/// Shown in the denial reply when the guild has neither a role binding nor a
/// known owner.
const UNBOUND: &str = "none";

/// One link in the dispatch chain: a module plus its frozen command table.
pub struct ModuleUnit {
    descriptor: ModuleDescriptor,
    module: Arc<dyn Module>,
    commands: OnceLock<CommandTable>,
    initializing: AtomicBool,
    settings: Arc<DispatchSettings>,
    services: Services,
}

impl ModuleUnit {
    pub fn new(module: Arc<dyn Module>, settings: Arc<DispatchSettings>, services: Services) -> Self {
        let descriptor = ModuleDescriptor {
            name: module.name().to_string(),
            always_activated: module.always_activated(),
        };
        Self {
            descriptor,
            module,
            commands: OnceLock::new(),
            initializing: AtomicBool::new(false),
            settings,
            services,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    /// The frozen command table, once initialized.
    pub fn commands(&self) -> Option<&CommandTable> {
        self.commands.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.commands.get().is_some()
    }

    /// Run the module's setup, then build and freeze its command table.
    ///
    /// Succeeds at most once; later calls return
    /// [`Error::AlreadyInitialized`] and leave the table untouched. A failed
    /// attempt may be retried.
    pub async fn initialize(&self, ctx: &InitContext) -> Result<()> {
        if self.initializing.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyInitialized {
                module: self.descriptor.name.clone(),
            });
        }

        let result = self.build_table(ctx).await;
        match result {
            Ok(table) => {
                info!(
                    module = self.name(),
                    commands = table.len(),
                    "module initialized"
                );
                self.commands
                    .set(table)
                    .map_err(|_| Error::AlreadyInitialized {
                        module: self.descriptor.name.clone(),
                    })
            },
            Err(e) => {
                self.initializing.store(false, Ordering::Release);
                Err(e)
            },
        }
    }

    async fn build_table(&self, ctx: &InitContext) -> Result<CommandTable> {
        self.module
            .init(ctx)
            .await
            .map_err(|source| Error::ModuleInit {
                module: self.descriptor.name.clone(),
                source: source.into(),
            })?;

        let mut registry = CommandRegistry::new(self.name());
        self.module.register_commands(&mut registry)?;
        Ok(registry.freeze())
    }

    /// Whether this module is switched on for `guild_id`.
    pub async fn is_enabled_for(&self, guild_id: &str) -> Result<bool> {
        let disabled = self
            .services
            .gate
            .disabled_modules(guild_id)
            .await
            .map_err(|e| Error::collaborator(self.name(), "activation gate", e))?;
        Ok(!disabled.iter().any(|m| m == self.name()))
    }

    /// Handle one message, then run `next` or end dispatch.
    ///
    /// Direct messages follow the configured policy. A module switched off
    /// for the guild passes the message straight on. A matching command runs
    /// (or is refused) and ends dispatch; anything else goes to the module's
    /// `handle`.
    pub async fn dispatch<'a>(
        &'a self,
        message: &'a ChatMessage,
        next: Next<'a>,
    ) -> Result<Dispatch> {
        let table = self.commands.get().ok_or_else(|| Error::NotInitialized {
            module: self.descriptor.name.clone(),
        })?;

        let Some(guild_id) = message.guild_id.as_deref() else {
            return match self.settings.direct_messages {
                DirectMessagePolicy::Stop => {
                    debug!(
                        module = self.name(),
                        author_id = %message.author_id,
                        "direct message stops dispatch"
                    );
                    Ok(Dispatch::Stopped {
                        module: self.descriptor.name.clone(),
                    })
                },
                DirectMessagePolicy::Forward => next.run().await,
            };
        };

        if !self.is_enabled_for(guild_id).await? {
            debug!(module = self.name(), guild_id, "module disabled for guild, skipping");
            return next.run().await;
        }

        let matched = parse_command_line(&self.settings.prefix, &message.content)
            .and_then(|line| table.get(line.name).map(|command| (line, command)));
        let Some((line, command)) = matched else {
            return self.module.handle(message, next).await;
        };

        if command.only_privileged() {
            let binding = self
                .services
                .permissions
                .privileged_role_or_owner(guild_id)
                .await
                .map_err(|e| Error::collaborator(self.name(), "permission resolver", e))?;

            if !is_authorized(self.settings.owner_id.as_deref(), message, binding.as_deref()) {
                return Ok(self.deny(message, guild_id, &line, binding).await);
            }
        }

        self.execute(message, guild_id, &line, command).await;
        Ok(Dispatch::Executed {
            module: self.descriptor.name.clone(),
            command: line.name.to_string(),
        })
    }

    async fn deny(
        &self,
        message: &ChatMessage,
        guild_id: &str,
        line: &CommandLine<'_>,
        binding: Option<String>,
    ) -> Dispatch {
        info!(
            module = self.name(),
            guild_id,
            command = line.name,
            author_id = %message.author_id,
            "privileged command denied"
        );
        let text = self
            .settings
            .denial_message(binding.as_deref().unwrap_or(UNBOUND));
        if let Err(e) = self.services.outbound.reply(message, &text).await {
            warn!(module = self.name(), guild_id, error = %e, "failed to send denial reply");
        }
        Dispatch::Denied {
            module: self.descriptor.name.clone(),
            command: line.name.to_string(),
            required: binding,
        }
    }

    async fn execute(
        &self,
        message: &ChatMessage,
        guild_id: &str,
        line: &CommandLine<'_>,
        command: &Command,
    ) {
        info!(
            module = self.name(),
            guild_id,
            command = line.name,
            author_id = %message.author_id,
            "executing command"
        );
        let invocation = Invocation::new(
            message,
            guild_id,
            line,
            Arc::clone(&self.services.outbound),
        );
        if let Err(e) = command.handler().call(invocation).await {
            warn!(
                module = self.name(),
                guild_id,
                command = line.name,
                error = %e,
                "command handler failed"
            );
        }
    }
}

impl std::fmt::Debug for ModuleUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleUnit")
            .field("descriptor", &self.descriptor)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}
