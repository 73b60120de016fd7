use std::error::Error as StdError;

/// Failures reported by a [`crate::ReplyOutbound`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The platform refused or lost a reply.
    #[error("reply to channel {channel_id} was not delivered: {source}")]
    Delivery {
        channel_id: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("{0}")]
    Message(String),
}

impl Error {
    #[must_use]
    pub fn delivery(
        channel_id: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Delivery {
            channel_id: channel_id.into(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Channel the failed reply was addressed to, when known.
    pub fn channel_id(&self) -> Option<&str> {
        match self {
            Self::Delivery { channel_id, .. } => Some(channel_id),
            Self::Message(_) => None,
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ── `.context()` for crate-local errors ─────────────────────────────────────

/// Builds an error from a plain message. Required by [`impl_context!`].
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Define a `Context` trait for the invoking module's `Error`/`Result` pair.
///
/// `Result<T, E: Display>` and `Option<T>` gain `.context(..)` and
/// `.with_context(|| ..)`. Failed results read `"{context}: {source}"`;
/// empty options carry the bare context.
///
/// ```ignore
/// // crates/modules/src/error.rs
/// guildbot_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T>: Sized {
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;

            fn context(self, context: impl Into<String>) -> Result<T> {
                let context = context.into();
                self.with_context(move || context)
            }
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let context: String = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{context}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}
