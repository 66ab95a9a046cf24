use thiserror::Error;

#[derive(Error, Debug)]
pub enum CwLensError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid time format '{input}': {reason}")]
    InvalidTimeFormat { input: String, reason: String },
    #[error("Unexpected value for field '{field}': {value}")]
    Projection { field: String, value: String },
    #[error("Log group '{0}' not found")]
    LogGroupNotFound(String),
    #[error("{0}")]
    NoData(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CwLensError {
    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        CwLensError::InvalidInput(msg.into())
    }

    /// Stable name of the error kind, reported as `error_type` in responses.
    pub fn kind(&self) -> &'static str {
        match self {
            CwLensError::InvalidInput(_) => "InvalidInput",
            CwLensError::InvalidTimeFormat { .. } => "InvalidTimeFormat",
            CwLensError::Projection { .. } => "ProjectionError",
            CwLensError::LogGroupNotFound(_) => "LogGroupNotFound",
            CwLensError::NoData(_) => "NoData",
            CwLensError::Configuration(_) => "ConfigurationError",
            CwLensError::Backend(_) => "BackendError",
            CwLensError::Serialization(_) => "SerializationError",
        }
    }

    /// Innermost cause in the error chain, if there is one beyond the error itself.
    pub fn root_cause_message(&self) -> Option<String> {
        match self {
            CwLensError::Backend(err) => Some(err.root_cause().to_string()),
            other => {
                let mut source = std::error::Error::source(other);
                let mut last = None;
                while let Some(err) = source {
                    last = Some(err.to_string());
                    source = err.source();
                }
                last.or_else(|| Some(other.to_string()))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, CwLensError>;
