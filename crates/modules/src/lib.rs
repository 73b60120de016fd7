//! Module dispatch pipeline.
//!
//! Inbound chat messages travel through an ordered chain of modules. Each
//! [`ModuleUnit`] checks whether its module is enabled for the message's
//! guild, parses a prefixed command against its [`CommandTable`], enforces the
//! privileged-role check, and then either runs the command (ending dispatch)
//! or hands the message to the module's own `handle` logic together with the
//! [`Next`] continuation.
//!
//! [`ModuleHub`] owns the chain and builds the continuation for every message.

pub mod bindings;
pub mod command;
pub mod error;
pub mod gate;
pub mod hub;
pub mod module;
pub mod next;
pub mod settings;
pub mod store;
pub mod unit;

pub use {
    bindings::{GuildDirectory, StaticGuildDirectory, StoreActivationGate, StorePermissionResolver},
    command::{Command, CommandHandler, CommandRegistry, CommandTable, Invocation, handler_fn},
    error::{Error, Result},
    gate::{ActivationGate, PermissionResolver, is_authorized},
    hub::{ModuleCatalog, ModuleHub, ModuleHubBuilder, Services},
    module::{InitContext, Module, ModuleDescriptor},
    next::{Dispatch, Next},
    settings::DispatchSettings,
    store::{KeyValueStore, MemoryStore},
    unit::ModuleUnit,
};
