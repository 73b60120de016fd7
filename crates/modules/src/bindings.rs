//! Activation gate and permission resolver backed by a [`KeyValueStore`].
//!
//! Disabled modules live under [`keys::DISABLED_MODULES`] and the moderator
//! role under [`keys::MOD_ROLE`]. Without a bound role, the guild owner from
//! the [`GuildDirectory`] is authorized instead.

use std::sync::Arc;

use {
    async_trait::async_trait, dashmap::DashMap, serde_json::Value, tokio::sync::Mutex,
    tracing::debug,
};

use crate::{
    Error, Result,
    error::Context,
    gate::{ActivationGate, PermissionResolver},
    store::{KeyValueStore, keys},
};

/// Guild metadata known to the chat platform.
#[async_trait]
pub trait GuildDirectory: Send + Sync {
    /// User ID of the guild's owner, if the guild is known.
    async fn owner_id(&self, guild_id: &str) -> anyhow::Result<Option<String>>;
}

/// Map-backed [`GuildDirectory`].
#[derive(Debug, Default)]
pub struct StaticGuildDirectory {
    owners: DashMap<String, String>,
}

impl StaticGuildDirectory {
    pub fn insert(&self, guild_id: impl Into<String>, owner_id: impl Into<String>) {
        self.owners.insert(guild_id.into(), owner_id.into());
    }
}

#[async_trait]
impl GuildDirectory for StaticGuildDirectory {
    async fn owner_id(&self, guild_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.owners.get(guild_id).map(|o| o.value().clone()))
    }
}

/// Reads and maintains each guild's disabled-module list.
pub struct StoreActivationGate {
    store: Arc<dyn KeyValueStore>,
    /// Held across the read-modify-write in `set_enabled`.
    writes: Mutex<()>,
}

impl StoreActivationGate {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            writes: Mutex::new(()),
        }
    }

    async fn load(&self, guild_id: &str) -> Result<Vec<String>> {
        let value = self
            .store
            .read(guild_id, keys::DISABLED_MODULES)
            .await
            .map_err(|e| Error::store(format!("read {}", keys::DISABLED_MODULES), e))?;
        match value {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).with_context(|| {
                format!("guild {guild_id}: {} is not a list of names", keys::DISABLED_MODULES)
            }),
        }
    }

    /// Switch `module` on or off for `guild_id`. Returns whether anything
    /// changed. Does not check that the module exists; see
    /// [`crate::ModuleCatalog::toggleable`].
    pub async fn set_enabled(&self, guild_id: &str, module: &str, enabled: bool) -> Result<bool> {
        let _guard = self.writes.lock().await;
        let mut disabled = self.load(guild_id).await?;
        let listed = disabled.iter().any(|m| m == module);
        match (enabled, listed) {
            (true, true) => disabled.retain(|m| m != module),
            (false, false) => disabled.push(module.to_string()),
            _ => return Ok(false),
        }

        self.store
            .write(guild_id, keys::DISABLED_MODULES, Value::from(disabled))
            .await
            .map_err(|e| Error::store(format!("write {}", keys::DISABLED_MODULES), e))?;
        debug!(guild_id, module, enabled, "module activation changed");
        Ok(true)
    }
}

#[async_trait]
impl ActivationGate for StoreActivationGate {
    async fn disabled_modules(&self, guild_id: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.load(guild_id).await?)
    }
}

/// Resolves the moderator role, falling back to the guild owner.
pub struct StorePermissionResolver {
    store: Arc<dyn KeyValueStore>,
    directory: Arc<dyn GuildDirectory>,
}

impl StorePermissionResolver {
    pub fn new(store: Arc<dyn KeyValueStore>, directory: Arc<dyn GuildDirectory>) -> Self {
        Self { store, directory }
    }

    pub async fn set_privileged_role(&self, guild_id: &str, role_id: &str) -> Result<()> {
        self.store
            .write(guild_id, keys::MOD_ROLE, Value::from(role_id))
            .await
            .map_err(|e| Error::store(format!("write {}", keys::MOD_ROLE), e))?;
        debug!(guild_id, role_id, "moderator role bound");
        Ok(())
    }

    pub async fn clear_privileged_role(&self, guild_id: &str) -> Result<()> {
        self.store
            .delete(guild_id, keys::MOD_ROLE)
            .await
            .map_err(|e| Error::store(format!("delete {}", keys::MOD_ROLE), e))
    }

    async fn bound_role(&self, guild_id: &str) -> Result<Option<String>> {
        let value = self
            .store
            .read(guild_id, keys::MOD_ROLE)
            .await
            .map_err(|e| Error::store(format!("read {}", keys::MOD_ROLE), e))?;
        match value {
            Some(Value::String(role)) if !role.is_empty() => Ok(Some(role)),
            None | Some(Value::Null) | Some(Value::String(_)) => Ok(None),
            Some(other) => Err(Error::Message {
                message: format!("guild {guild_id}: {} must be a string, got {other}", keys::MOD_ROLE),
            }),
        }
    }
}

#[async_trait]
impl PermissionResolver for StorePermissionResolver {
    async fn privileged_role_or_owner(&self, guild_id: &str) -> anyhow::Result<Option<String>> {
        if let Some(role) = self.bound_role(guild_id).await? {
            return Ok(Some(role));
        }
        self.directory.owner_id(guild_id).await
    }
}
