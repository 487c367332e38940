//! Error types for NewsCheck

/// Result type alias using NewsCheck's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for NewsCheck operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A model artifact is missing, unreadable, or structurally invalid
    #[error("artifact load error: {0}")]
    ArtifactLoad(String),

    /// Embedding or classification failed on well-formed input
    #[error("inference error: {0}")]
    Inference(String),

    /// Input rejected by the service layer (too short, unreadable URL)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new artifact load error
    pub fn artifact(msg: impl Into<String>) -> Self {
        Self::ArtifactLoad(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short machine-readable kind, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ArtifactLoad(_) => "artifact_load",
            Self::Inference(_) => "inference",
            Self::InvalidInput(_) => "invalid_input",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_and_kind() {
        let err = Error::artifact("sbert_logreg.json not found");
        assert_eq!(err.to_string(), "artifact load error: sbert_logreg.json not found");
        assert_eq!(err.kind(), "artifact_load");

        let err = Error::inference("dimension mismatch");
        assert_eq!(err.kind(), "inference");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), "io");
    }
}
