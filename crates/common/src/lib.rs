//! Shared types, error definitions, and the outbound reply seam used across
//! all guildbot crates.

pub mod error;
pub mod outbound;
pub mod types;

pub use {
    error::{Error, FromMessage, Result},
    outbound::ReplyOutbound,
    types::ChatMessage,
};
