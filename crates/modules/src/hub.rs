use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use {
    guildbot_common::{ChatMessage, ReplyOutbound},
    tracing::{debug, info},
};

use crate::{
    DispatchSettings, Error, Result,
    gate::{ActivationGate, PermissionResolver},
    module::{InitContext, Module, ModuleDescriptor},
    next::{Dispatch, Next},
    unit::ModuleUnit,
};

/// External collaborators shared by every unit in a hub.
#[derive(Clone)]
pub struct Services {
    pub gate: Arc<dyn ActivationGate>,
    pub permissions: Arc<dyn PermissionResolver>,
    pub outbound: Arc<dyn ReplyOutbound>,
}

/// Descriptors of every module in a hub, in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct ModuleCatalog {
    modules: Arc<[ModuleDescriptor]>,
}

impl ModuleCatalog {
    pub fn new(modules: Vec<ModuleDescriptor>) -> Self {
        Self {
            modules: modules.into(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Look up a module a guild is allowed to switch on or off.
    pub fn toggleable(&self, name: &str) -> Result<&ModuleDescriptor> {
        let descriptor = self.find(name).ok_or_else(|| Error::UnknownModule {
            name: name.to_string(),
        })?;
        if descriptor.always_activated {
            return Err(Error::AlwaysActivated {
                name: name.to_string(),
            });
        }
        Ok(descriptor)
    }
}

/// Collects modules in registration order.
pub struct ModuleHubBuilder {
    settings: Arc<DispatchSettings>,
    services: Services,
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleHubBuilder {
    /// Append a module to the end of the chain.
    #[must_use]
    pub fn module(self, module: impl Module + 'static) -> Self {
        self.shared_module(Arc::new(module))
    }

    /// Append a module that is also held elsewhere.
    #[must_use]
    pub fn shared_module(mut self, module: Arc<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    /// Validate module names and wrap each module in a unit.
    pub fn build(self) -> Result<ModuleHub> {
        let mut seen = HashSet::new();
        for module in &self.modules {
            let name = module.name();
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(Error::InvalidModuleName {
                    name: name.to_string(),
                });
            }
            if !seen.insert(name) {
                return Err(Error::DuplicateModule {
                    name: name.to_string(),
                });
            }
        }

        let units: Vec<ModuleUnit> = self
            .modules
            .into_iter()
            .map(|module| {
                ModuleUnit::new(module, Arc::clone(&self.settings), self.services.clone())
            })
            .collect();
        let catalog = ModuleCatalog::new(units.iter().map(|u| u.descriptor().clone()).collect());

        Ok(ModuleHub {
            units,
            initialized: AtomicBool::new(false),
            catalog,
            settings: self.settings,
            services: self.services,
        })
    }
}

/// Owns the module chain and runs every inbound message through it.
pub struct ModuleHub {
    units: Vec<ModuleUnit>,
    initialized: AtomicBool,
    catalog: ModuleCatalog,
    settings: Arc<DispatchSettings>,
    services: Services,
}

impl ModuleHub {
    pub fn builder(settings: DispatchSettings, services: Services) -> ModuleHubBuilder {
        ModuleHubBuilder {
            settings: Arc::new(settings),
            services,
            modules: Vec::new(),
        }
    }

    /// Initialize every unit in order. The first failure is returned and the
    /// remaining units are left uninitialized; calling again resumes with the
    /// units that are not yet initialized. Once every unit is up, further
    /// calls fail with [`Error::HubAlreadyInitialized`].
    pub async fn initialize(&self) -> Result<()> {
        if self.initialized.load(Ordering::Acquire) {
            return Err(Error::HubAlreadyInitialized);
        }
        let ctx = InitContext {
            catalog: self.catalog.clone(),
            settings: Arc::clone(&self.settings),
        };
        for unit in self.units.iter().filter(|u| !u.is_initialized()) {
            unit.initialize(&ctx).await?;
        }
        self.initialized.store(true, Ordering::Release);
        info!(modules = self.units.len(), "module hub initialized");
        Ok(())
    }

    /// Run `message` through the chain, starting at the first unit.
    pub async fn dispatch(&self, message: &ChatMessage) -> Result<Dispatch> {
        let outcome = Next::new(&self.units, message).run().await?;
        debug!(
            guild_id = message.guild_id.as_deref().unwrap_or("-"),
            author_id = %message.author_id,
            outcome = ?outcome,
            "message dispatched"
        );
        Ok(outcome)
    }

    pub fn catalog(&self) -> &ModuleCatalog {
        &self.catalog
    }

    pub fn unit(&self, name: &str) -> Option<&ModuleUnit> {
        self.units.iter().find(|u| u.name() == name)
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Module names switched off for `guild_id`, straight from the gate.
    pub async fn disabled_modules(&self, guild_id: &str) -> Result<Vec<String>> {
        self.services
            .gate
            .disabled_modules(guild_id)
            .await
            .map_err(|e| Error::collaborator("hub", "activation gate", e))
    }
}
