//! Error types for the aesthetic_vision engine.

use thiserror::Error;

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Everything that can stop an analysis from producing a report.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The input image could not be decoded, or has a zero dimension.
    #[error("Invalid input image: {message}")]
    InvalidInput {
        message: String,
        #[source]
        source: Option<image::ImageError>,
    },

    /// A tunable parameter is outside its documented range.
    #[error("Invalid parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    /// A detector marked as required for this analysis failed or is missing.
    #[error("Required collaborator `{collaborator}` failed: {message}")]
    DependencyFailure {
        collaborator: &'static str,
        message: String,
    },

    /// The report builder was asked to finish before a mandatory metric was recorded.
    #[error("Report is missing mandatory metric `{metric}`")]
    IncompleteReport { metric: &'static str },

    /// A configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A blocking analysis task panicked or was cancelled.
    #[error("Analysis task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The worker pool is no longer accepting jobs.
    #[error("Worker pool unavailable: {0}")]
    PoolClosed(&'static str),
}

impl AnalysisError {
    /// Create an invalid-input error wrapping a decoder failure.
    pub fn decode(message: impl Into<String>, source: image::ImageError) -> Self {
        Self::InvalidInput {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create an invalid-input error without an underlying cause.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Whether the caller sent something unusable, as opposed to an engine-side failure.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidInput { .. }
                | AnalysisError::InvalidParameter { .. }
                | AnalysisError::ConfigParse(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_formats_name_and_value() {
        let err = AnalysisError::invalid_parameter("min_size", 0);
        assert_eq!(err.to_string(), "Invalid parameter: min_size = 0");
        assert!(err.is_caller_error());
    }

    #[test]
    fn dependency_failure_is_not_a_caller_error() {
        let err = AnalysisError::DependencyFailure {
            collaborator: "face_detector",
            message: "model missing".to_string(),
        };
        assert!(!err.is_caller_error());
        assert!(err.to_string().contains("face_detector"));
    }
}
