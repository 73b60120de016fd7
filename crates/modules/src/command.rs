//! Command registration and lookup.
//!
//! A module declares its commands once, through a [`CommandRegistry`], while
//! its unit initializes. The registry is then frozen into a [`CommandTable`]
//! that is only ever read.

use std::{collections::HashMap, future::Future, sync::Arc};

use {
    async_trait::async_trait,
    guildbot_common::{ChatMessage, ReplyOutbound},
};

use crate::{Error, Result};

/// Everything a command handler gets to see.
#[derive(Clone)]
pub struct Invocation {
    /// The full message that triggered the command.
    pub message: ChatMessage,
    /// Matched command name, without prefix.
    pub command: String,
    /// Whitespace-separated tokens after the command name.
    pub args: Vec<String>,
    guild_id: String,
    outbound: Arc<dyn ReplyOutbound>,
}

impl Invocation {
    pub(crate) fn new(
        message: &ChatMessage,
        guild_id: &str,
        line: &CommandLine<'_>,
        outbound: Arc<dyn ReplyOutbound>,
    ) -> Self {
        Self {
            message: message.clone(),
            command: line.name.to_string(),
            args: line.args.split_whitespace().map(str::to_string).collect(),
            guild_id: guild_id.to_string(),
            outbound,
        }
    }

    /// Reply to the triggering message.
    pub async fn reply(&self, text: &str) -> guildbot_common::Result<()> {
        self.outbound.reply(&self.message, text).await
    }

    /// Guild the command was issued in. Commands only run for guild messages.
    pub fn guild_id(&self) -> &str {
        &self.guild_id
    }
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("message", &self.message)
            .field("command", &self.command)
            .field("args", &self.args)
            .field("guild_id", &self.guild_id)
            .finish_non_exhaustive()
    }
}

/// The action behind a command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, invocation: Invocation) -> anyhow::Result<()>;
}

/// Adapter turning an async closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

/// Wrap an async closure as a command handler.
///
/// ```ignore
/// commands.command("ping", handler_fn(|inv| async move {
///     inv.reply("pong").await?;
///     Ok(())
/// }))?;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnHandler(f)
}

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(&self, invocation: Invocation) -> anyhow::Result<()> {
        (self.0)(invocation).await
    }
}

/// A registered command.
#[derive(Clone)]
pub struct Command {
    only_privileged: bool,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    /// Restricted to the bot owner and the guild's moderator binding.
    pub fn only_privileged(&self) -> bool {
        self.only_privileged
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("only_privileged", &self.only_privileged)
            .finish_non_exhaustive()
    }
}

/// Collects a module's commands during initialization.
pub struct CommandRegistry {
    module: String,
    commands: HashMap<String, Command>,
}

impl CommandRegistry {
    pub(crate) fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            commands: HashMap::new(),
        }
    }

    /// Register a command anyone may run.
    pub fn command(
        &mut self,
        name: &str,
        handler: impl CommandHandler + 'static,
    ) -> Result<&mut Self> {
        self.insert(name, false, Arc::new(handler))
    }

    /// Register a command restricted to the owner and moderators.
    pub fn privileged(
        &mut self,
        name: &str,
        handler: impl CommandHandler + 'static,
    ) -> Result<&mut Self> {
        self.insert(name, true, Arc::new(handler))
    }

    fn insert(
        &mut self,
        name: &str,
        only_privileged: bool,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<&mut Self> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidCommandName {
                module: self.module.clone(),
                name: name.to_string(),
            });
        }
        if self.commands.contains_key(name) {
            return Err(Error::DuplicateCommand {
                module: self.module.clone(),
                name: name.to_string(),
            });
        }
        self.commands.insert(name.to_string(), Command {
            only_privileged,
            handler,
        });
        Ok(self)
    }

    pub(crate) fn freeze(self) -> CommandTable {
        CommandTable {
            commands: self.commands,
        }
    }
}

/// Frozen name → command mapping owned by one unit. Names are case-sensitive.
#[derive(Debug, Default)]
pub struct CommandTable {
    commands: HashMap<String, Command>,
}

impl CommandTable {
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.commands.len()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// A prefixed command line split into name and remaining text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandLine<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

/// Split `content` into a command line if it starts with `prefix`.
///
/// The name is the first whitespace-delimited token with the prefix removed.
/// Returns `None` when the prefix is missing, nothing follows it, or the
/// prefix is immediately followed by whitespace.
pub fn parse_command_line<'a>(prefix: &str, content: &'a str) -> Option<CommandLine<'a>> {
    if prefix.is_empty() {
        return None;
    }
    let rest = content.strip_prefix(prefix)?;
    let (name, args) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], rest[idx..].trim()),
        None => (rest, ""),
    };
    if name.is_empty() {
        return None;
    }
    Some(CommandLine { name, args })
}
