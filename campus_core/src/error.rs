use std::error::Error as StdError;

/// Common error type for `campus_core`.
///
/// Connector implementations should preserve the underlying error chain
/// where possible via `Error::transport` / `Error::decode`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("missing credential: {0}")]
    MissingCredential(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("no data: {0}")]
    NoData(String),

    #[error("transport error: {context}")]
    Transport {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("decode error: {context}")]
    Decode {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },

    #[error("storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl Error {
    pub fn transport(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Convenience: wrap any error into `Transport` with "reqwest" context.
    pub fn transport_reqwest(source: impl StdError + Send + Sync + 'static) -> Self {
        Self::Transport {
            context: "reqwest".into(),
            source: Box::new(source),
        }
    }

    pub fn decode(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Decode {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn storage(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
