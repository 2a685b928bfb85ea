//! Error taxonomy shared by every lifecycle component.

/// All failures a lifecycle operation can surface to its caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// Empty prompt, empty name, missing code, or a request made in the wrong state.
    #[error("{0}")]
    Validation(String),

    /// The generation request failed or the endpoint answered `success: false`.
    #[error("generation failed: {0}")]
    Network(String),

    /// The durable store or export target could not be written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// No saved record with the given id.
    #[error("game {0} not found")]
    NotFound(String),

    /// The preview drawing surface is unavailable.
    #[error("preview surface unavailable: {0}")]
    Surface(String),
}

impl LifecycleError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Wrap an I/O failure chain from an internal `anyhow` context stack.
    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LifecycleError>;
