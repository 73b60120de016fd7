use {futures::future::BoxFuture, guildbot_common::ChatMessage};

use crate::{Result, unit::ModuleUnit};

/// How dispatch of one message ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A command ran.
    Executed { module: String, command: String },
    /// A privileged command was refused and the sender was told so.
    Denied {
        module: String,
        command: String,
        /// The binding the sender failed to match, if any was resolved.
        required: Option<String>,
    },
    /// A module's own `handle` consumed the message.
    Handled { module: String },
    /// A direct message reached a unit and dispatch stopped there.
    Stopped { module: String },
    /// Every unit passed the message on.
    Exhausted,
}

impl Dispatch {
    /// Convenience for `Module::handle` overrides that consume a message.
    pub fn handled(module: impl Into<String>) -> Self {
        Self::Handled {
            module: module.into(),
        }
    }

    /// Name of the module that ended dispatch, if one did.
    pub fn module(&self) -> Option<&str> {
        match self {
            Self::Executed { module, .. }
            | Self::Denied { module, .. }
            | Self::Handled { module }
            | Self::Stopped { module } => Some(module),
            Self::Exhausted => None,
        }
    }

    /// Whether some module ended dispatch (as opposed to falling off the end).
    pub fn is_consumed(&self) -> bool {
        !matches!(self, Self::Exhausted)
    }
}

/// Continuation resuming dispatch at the next unit.
///
/// Each unit receives exactly one `Next` per message. Running it consumes it,
/// so a unit cannot pass a message on twice.
#[must_use = "dropping `Next` without running it ends dispatch"]
pub struct Next<'a> {
    units: &'a [ModuleUnit],
    position: usize,
    message: &'a ChatMessage,
}

impl<'a> Next<'a> {
    /// Continuation starting at the first of `units`.
    pub fn new(units: &'a [ModuleUnit], message: &'a ChatMessage) -> Self {
        Self {
            units,
            position: 0,
            message,
        }
    }

    /// Continuation with nothing left to run; resolves to
    /// [`Dispatch::Exhausted`].
    pub fn end(message: &'a ChatMessage) -> Self {
        Self::new(&[], message)
    }

    /// Units left to run, including the one this continuation invokes.
    pub fn remaining(&self) -> usize {
        self.units.len().saturating_sub(self.position)
    }

    /// Name of the module this continuation will invoke.
    pub fn next_module(&self) -> Option<&'a str> {
        self.units.get(self.position).map(ModuleUnit::name)
    }

    /// Resume dispatch at the next unit.
    pub fn run(self) -> BoxFuture<'a, Result<Dispatch>> {
        Box::pin(async move {
            let Some(unit) = self.units.get(self.position) else {
                return Ok(Dispatch::Exhausted);
            };
            let after = Next {
                units: self.units,
                position: self.position + 1,
                message: self.message,
            };
            unit.dispatch(self.message, after).await
        })
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("position", &self.position)
            .field("remaining", &self.remaining())
            .field("next_module", &self.next_module())
            .finish()
    }
}
