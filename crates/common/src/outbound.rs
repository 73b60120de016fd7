use async_trait::async_trait;

use crate::{ChatMessage, Result};

/// Send text back to the chat platform.
///
/// The chat-platform adapter provides the concrete implementation.
#[async_trait]
pub trait ReplyOutbound: Send + Sync {
    /// Reply to `message` in the channel it was posted in.
    async fn reply(&self, message: &ChatMessage, text: &str) -> Result<()>;
}
