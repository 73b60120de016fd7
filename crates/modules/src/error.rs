use std::error::Error as StdError;

/// Crate-wide result type for dispatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed dispatch errors.
///
/// Registration errors (`DuplicateModule`, `InvalidModuleName`,
/// `InvalidCommandName`, `DuplicateCommand`) surface at startup and must stop
/// the process. A refused privileged command is not an error; see
/// [`crate::Dispatch::Denied`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two modules registered under the same name in one hub.
    #[error("module name \"{name}\" is registered more than once")]
    DuplicateModule { name: String },

    /// Module names must be non-empty and free of whitespace.
    #[error("invalid module name \"{name}\"")]
    InvalidModuleName { name: String },

    /// Command names must be non-empty and free of whitespace.
    #[error("module {module}: invalid command name \"{name}\"")]
    InvalidCommandName { module: String, name: String },

    /// A module registered the same command twice.
    #[error("module {module}: command \"{name}\" is registered more than once")]
    DuplicateCommand { module: String, name: String },

    /// The module's own setup failed.
    #[error("module {module} failed to initialize: {source}")]
    ModuleInit {
        module: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("module {module} is already initialized")]
    AlreadyInitialized { module: String },

    /// Every unit in the hub is already initialized.
    #[error("module hub is already initialized")]
    HubAlreadyInitialized,

    #[error("module {module} received a message before initialization")]
    NotInitialized { module: String },

    /// Activation gate or permission resolver query failed.
    #[error("module {module}: {context} unavailable: {source}")]
    Collaborator {
        module: String,
        context: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Key/value store access failed outside of dispatch.
    #[error("store operation failed: {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// No module with that name is registered.
    #[error("unknown module \"{name}\"")]
    UnknownModule { name: String },

    /// Always-activated modules cannot be switched off.
    #[error("module \"{name}\" is always activated")]
    AlwaysActivated { name: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn collaborator(
        module: impl Into<String>,
        context: &'static str,
        source: anyhow::Error,
    ) -> Self {
        Self::Collaborator {
            module: module.into(),
            context,
            source: source.into(),
        }
    }

    #[must_use]
    pub fn store(context: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Store {
            context: context.into(),
            source: source.into(),
        }
    }

    /// True for the errors that mean the chain itself is misconfigured.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::DuplicateModule { .. }
                | Self::InvalidModuleName { .. }
                | Self::InvalidCommandName { .. }
                | Self::DuplicateCommand { .. }
        )
    }
}

impl guildbot_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

guildbot_common::impl_context!();
