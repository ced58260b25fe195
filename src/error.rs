use thiserror::Error;

/// Result type for hermes operations
pub type Result<T> = std::result::Result<T, HermesError>;

/// Main error type for the hermes library
#[derive(Debug, Error)]
pub enum HermesError {
    /// Invalid dimensions for operations
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// A space the component cannot work with (e.g. a non-discrete action space)
    #[error("Unsupported space: {0}")]
    UnsupportedSpace(String),

    /// A value that does not belong to the space it was checked against
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    /// Invalid action
    #[error("Invalid action {action}: must be less than {num_actions}")]
    InvalidAction {
        action: usize,
        num_actions: usize,
    },

    /// The environment left out an entry for a registered agent
    #[error("Missing {field} for agent {agent}")]
    MissingAgentData {
        agent: usize,
        field: &'static str,
    },

    /// Not enough stored transitions
    #[error("Insufficient data: requested {requested}, available {available}")]
    InsufficientData {
        requested: usize,
        available: usize,
    },

    /// Failure raised by an environment adapter
    #[error("Environment error: {0}")]
    Environment(String),

    /// Numerical computation errors
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// JSON configuration errors
    #[error("Configuration error: {0}")]
    Json(#[from] serde_json::Error),

    /// Array reshaping errors
    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

// Helper functions for common error patterns
impl HermesError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        HermesError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        HermesError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = HermesError::invalid_parameter("batch_size", "must be smaller than memory_size");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'batch_size': must be smaller than memory_size"
        );

        let err = HermesError::InvalidAction { action: 7, num_actions: 5 };
        assert_eq!(err.to_string(), "Invalid action 7: must be less than 5");

        let err = HermesError::MissingAgentData { agent: 3, field: "reward" };
        assert_eq!(err.to_string(), "Missing reward for agent 3");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: HermesError = io.into();
        assert!(matches!(err, HermesError::Io(_)));
    }
}
