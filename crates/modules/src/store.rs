use {async_trait::async_trait, dashmap::DashMap, serde_json::Value};

/// Well-known per-guild keys.
pub mod keys {
    /// Array of module names switched off for the guild.
    pub const DISABLED_MODULES: &str = "disabledModules";
    /// Role ID allowed to run privileged commands.
    pub const MOD_ROLE: &str = "modRole";
}

/// Per-guild key/value storage backing activation state and role bindings.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn read(&self, guild_id: &str, key: &str) -> anyhow::Result<Option<Value>>;
    async fn write(&self, guild_id: &str, key: &str, value: Value) -> anyhow::Result<()>;
    async fn delete(&self, guild_id: &str, key: &str) -> anyhow::Result<()>;
}

/// In-process store. Contents are lost on exit.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<(String, String), Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn read(&self, guild_id: &str, key: &str) -> anyhow::Result<Option<Value>> {
        Ok(self
            .entries
            .get(&(guild_id.to_string(), key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn write(&self, guild_id: &str, key: &str, value: Value) -> anyhow::Result<()> {
        self.entries
            .insert((guild_id.to_string(), key.to_string()), value);
        Ok(())
    }

    async fn delete(&self, guild_id: &str, key: &str) -> anyhow::Result<()> {
        self.entries.remove(&(guild_id.to_string(), key.to_string()));
        Ok(())
    }
}
