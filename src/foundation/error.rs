/// Convenience result type used across the engine.
pub type SmilResult<T> = Result<T, SmilError>;

/// Top-level error taxonomy used by engine APIs.
#[derive(thiserror::Error, Debug)]
pub enum SmilError {
    /// Invalid document structure or programming error. Never retried.
    #[error("structure error: {0}")]
    Structure(String),

    /// Invalid attribute or configuration value.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while computing an animated value.
    #[error("animation error: {0}")]
    Animation(String),

    /// Errors raised by a render collaborator.
    #[error("render error: {0}")]
    Render(String),

    /// A task submitted with `invoke_and_wait` was dropped before it could run.
    #[error("wait interrupted: task was dropped before running")]
    Interrupted,

    /// The update queue worker is not running.
    #[error("update queue not started or has exited")]
    QueueStopped,

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SmilError {
    /// Build a [`SmilError::Structure`] value.
    pub fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }

    /// Build a [`SmilError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SmilError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    /// Build a [`SmilError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`SmilError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for errors that indicate an invalid document rather than a transient state.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structure(_) | Self::Validation(_))
    }
}

impl From<serde_json::Error> for SmilError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
