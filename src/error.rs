//! Error taxonomy for the pipeline engine

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The seven error kinds named in the error handling design: cycles/dangling
/// edges belong to `InvalidGraph`, bad handler configuration to
/// `InvalidConfig`, and so on. `ExecutionState.Error.kind` is always one of
/// these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidGraph,
    InvalidConfig,
    MissingInput,
    External,
    Timeout,
    Cancelled,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidGraph => "invalid_graph",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::MissingInput => "missing_input",
            ErrorKind::External => "external",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Main error type for the pipeline engine
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("external service error: {0}")]
    External(String),

    #[error("timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl PipelineError {
    /// Classify this error into one of the seven taxonomy kinds
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidGraph(_) => ErrorKind::InvalidGraph,
            PipelineError::InvalidConfig(_) => ErrorKind::InvalidConfig,
            PipelineError::MissingInput(_) => ErrorKind::MissingInput,
            PipelineError::External(_) => ErrorKind::External,
            PipelineError::Timeout(_) => ErrorKind::Timeout,
            PipelineError::Cancelled => ErrorKind::Cancelled,
            PipelineError::Internal(_)
            | PipelineError::Serialization(_)
            | PipelineError::Io(_)
            | PipelineError::Database(_)
            | PipelineError::Generic(_) => ErrorKind::Internal,
        }
    }

    /// Whether this error should degrade (return a fallback output) rather
    /// than fail the whole run. Only reranker and augmentor handlers consult
    /// this; every other handler kind treats all errors as fatal.
    pub fn degrades(&self) -> bool {
        matches!(self.kind(), ErrorKind::External | ErrorKind::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_and_external_degrade() {
        assert!(PipelineError::External("boom".into()).degrades());
        assert!(PipelineError::Timeout(std::time::Duration::from_secs(1)).degrades());
        assert!(!PipelineError::Cancelled.degrades());
        assert!(!PipelineError::InvalidConfig("bad".into()).degrades());
    }

    #[test]
    fn kind_classification() {
        assert_eq!(PipelineError::InvalidGraph("x".into()).kind(), ErrorKind::InvalidGraph);
        assert_eq!(PipelineError::Cancelled.kind(), ErrorKind::Cancelled);
    }
}
