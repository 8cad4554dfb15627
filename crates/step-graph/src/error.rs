//! Error types for the step graph

use thiserror::Error;

use crate::step::StepError;
use crate::types::DataRole;

/// Result type alias using StepGraphError
pub type Result<T> = std::result::Result<T, StepGraphError>;

/// Errors that can occur while assembling or running a model
#[derive(Debug, Error)]
pub enum StepGraphError {
    /// Two or more steps in one model share a name
    #[error("A model cannot contain steps with duplicated names: {}", .names.join(", "))]
    DuplicateStepName { names: Vec<String> },

    /// The dependency graph has no topological order
    #[error("Cycle detected in step graph at step '{step}'")]
    CyclicGraph { step: String },

    /// Required inputs were not supplied
    #[error("The following inputs are required but were not specified: {}", .names.join(", "))]
    MissingInput { names: Vec<String> },

    /// Supplied inputs are not needed (only raised under `UnusedInputPolicy::Deny`)
    #[error("The following inputs were provided but are not required: {}", .names.join(", "))]
    UnusedInput { names: Vec<String> },

    /// A name given by the caller does not match any slot of the model
    #[error("'{name}' was not found in the model")]
    UnknownDataName { name: String },

    /// Positional data count does not match the declared slots
    #[error("The number of {role} values does not match the model: expected {expected} but got {actual}")]
    ArityMismatch {
        role: DataRole,
        expected: usize,
        actual: usize,
    },

    /// A step can neither predict nor transform
    #[error("Step '{step}' must implement either predict or transform")]
    UncomputableStep { step: String },

    /// A slot handle does not belong to the arena it was used with
    #[error("Invalid data slot: {0}")]
    InvalidSlot(String),

    /// A step handle does not belong to the arena it was used with
    #[error("Unknown step: {0}")]
    UnknownStep(String),

    /// A step name cannot be registered
    #[error("Invalid step name '{name}': {reason}")]
    InvalidStepName { name: String, reason: String },

    /// A step produced a different number of values than it declares outputs
    #[error("Step '{step}' produced {actual} values but declares {expected} outputs")]
    OutputCountMismatch {
        step: String,
        expected: usize,
        actual: usize,
    },

    /// A requested output never received a value
    #[error("Output '{name}' was not computed")]
    MissingOutput { name: String },

    /// A step's own operation failed
    #[error("Step '{step}' failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: StepError,
    },
}

impl StepGraphError {
    /// Wrap an error raised by a step's own operation
    pub fn step_failed(step: impl Into<String>, source: StepError) -> Self {
        Self::StepFailed {
            step: step.into(),
            source,
        }
    }

    /// Create an unknown data name error
    pub fn unknown_name(name: impl Into<String>) -> Self {
        Self::UnknownDataName { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_list_every_name() {
        let err = StepGraphError::DuplicateStepName {
            names: vec!["scaler".to_string(), "pca".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "A model cannot contain steps with duplicated names: scaler, pca"
        );

        let err = StepGraphError::MissingInput {
            names: vec!["x1".to_string(), "x2".to_string()],
        };
        assert!(err.to_string().ends_with("x1, x2"));
    }

    #[test]
    fn test_step_failed_keeps_source() {
        let source: StepError = "matrix is singular".into();
        let err = StepGraphError::step_failed("solver", source);
        let inner = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(inner.as_deref(), Some("matrix is singular"));
    }

    #[test]
    fn test_arity_message_names_role() {
        let err = StepGraphError::ArityMismatch {
            role: DataRole::Target,
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "The number of target values does not match the model: expected 2 but got 3"
        );
    }
}
