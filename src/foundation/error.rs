/// Convenience result type used across Reverie.
pub type ReverieResult<T> = Result<T, ReverieError>;

/// Errors surfaced by the engine's public entry points.
///
/// Recoverable platform failures (blocked playback, missing assets, denied microphone access) are
/// absorbed and logged by the component that hit them; only programming and data errors surface
/// through this type.
#[derive(thiserror::Error, Debug)]
pub enum ReverieError {
    /// Invalid user-provided script or tuning data.
    #[error("invalid script data: {0}")]
    Validation(String),

    /// Script-level programming errors, such as an unknown scene key.
    #[error("script error: {0}")]
    Script(String),

    /// Script JSON that failed to parse or serialize.
    #[error("script JSON: {0}")]
    Serde(String),

    /// Anything else, carried through from a dependency.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReverieError {
    /// Build a [`ReverieError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReverieError::Script`] value.
    pub fn script(msg: impl Into<String>) -> Self {
        Self::Script(msg.into())
    }

    /// Build a [`ReverieError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for ReverieError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
