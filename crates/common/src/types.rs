use serde::{Deserialize, Serialize};

/// An inbound chat message as seen by the dispatch pipeline.
///
/// Produced by the chat-platform adapter; modules only ever read it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Sender's user ID.
    pub author_id: String,
    /// Originating guild. `None` for direct (private) messages.
    pub guild_id: Option<String>,
    /// Channel the message was posted in; replies go back here.
    pub channel_id: String,
    /// Raw text content.
    pub content: String,
    /// Role IDs the sender holds within the guild.
    #[serde(default)]
    pub member_roles: Vec<String>,
}

impl ChatMessage {
    /// A direct message from `author_id`.
    pub fn new(author_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author_id: author_id.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_guild(mut self, guild_id: impl Into<String>) -> Self {
        self.guild_id = Some(guild_id.into());
        self
    }

    #[must_use]
    pub fn in_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.member_roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_direct(&self) -> bool {
        self.guild_id.is_none()
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.member_roles.iter().any(|r| r == role_id)
    }
}
