/// Result alias that carries the custom [`ScrollStageError`] type.
pub type Result<T> = std::result::Result<T, ScrollStageError>;

/// Common error type for the core crate.
///
/// Gesture handling and navigation never fail; only configuration loading
/// and validation surface errors to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ScrollStageError {
    /// Free-form message, mostly produced by the command line shell.
    #[error("{0}")]
    Message(String),
    /// A configuration value that the engine cannot run with.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON in a configuration file or input script.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl ScrollStageError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a configuration error.
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<&str> for ScrollStageError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for ScrollStageError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
