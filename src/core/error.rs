//! Error types for the handler and its sinks

pub type Result<T> = std::result::Result<T, HandlerError>;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Sink failed to deliver an entry
    #[error("Sink '{sink}' failed to deliver entry: {message}")]
    SinkDelivery { sink: String, message: String },

    /// Sink worker is gone
    #[error("Sink stopped")]
    SinkStopped,

    /// Wait aborted by a cancelled context
    #[error("Context cancelled while waiting for sink")]
    Cancelled,

    /// Wait aborted by the context deadline
    #[error("Context deadline exceeded while waiting for sink")]
    DeadlineExceeded,

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Labels file could not be parsed
    #[error("Malformed labels file '{path}': {message}")]
    LabelsFile { path: String, message: String },

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    /// Create a sink delivery error
    pub fn sink(sink: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::SinkDelivery {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a labels file error
    pub fn labels_file(path: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::LabelsFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        HandlerError::Other(msg.into())
    }

    /// Whether the error came from the caller's context rather than the sink
    pub fn is_context_error(&self) -> bool {
        matches!(self, HandlerError::Cancelled | HandlerError::DeadlineExceeded)
    }
}
