/// Result alias that carries the custom [`ScriptError`] type.
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Free-form failure, mostly configuration problems.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed configuration documents.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// A rest whose duration would move the script clock backwards.
    #[error("rest duration must be a non-negative number of beats, got {0}")]
    InvalidRest(f64),
    /// A single drain processed more entries than allowed. Usually a loop
    /// body without any rest in it.
    #[error("drain at beat {beat} exceeded {limit} entries without resting")]
    DrainLimitExceeded { limit: usize, beat: f64 },
}

impl ScriptError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}
