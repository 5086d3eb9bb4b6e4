//! Error types for step pipelines.
//!
//! Configuration errors describe a pipeline that cannot run as assembled
//! (no steps, a non-callable entry, a missing secondary input, a bad
//! parameter binding). Validation errors describe input of the wrong shape.
//! Errors raised by step functions themselves pass through unchanged.
//!
//! Errors serialize as `{code, message}` so callers can forward them to a
//! frontend or write them as JSON.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for pipeline assembly and execution.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// `transform` was called on a pipeline without steps.
    #[error(
        "No steps registered: the pipeline is empty, register step functions with add_step or StepPipeline::add"
    )]
    NoSteps,

    /// A step entry has no callable behind it.
    #[error("Expected a callable step at position {position}, but '{name}' is not callable")]
    NotCallable { position: usize, name: String },

    /// A step declares a secondary input but the caller supplied none.
    #[error(
        "Step '{name}' at position {position} requires a secondary input (y), but none was provided"
    )]
    MissingTarget { position: usize, name: String },

    /// A bound parameter is not declared by the step signature.
    #[error("Step '{step}' does not declare a parameter named '{param}'")]
    UnknownParameter { step: String, param: String },

    /// A declared parameter without a default was never bound.
    #[error("Step '{step}' requires parameter '{param}', but no value is bound")]
    MissingParameter { step: String, param: String },

    /// Step input has the wrong container type or shape.
    #[error("Invalid input for step at position {position}: {reason}")]
    Validation { position: usize, reason: String },

    /// A bound parameter is absent or has the wrong type.
    #[error("Invalid parameter '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },

    /// A step name could not be resolved against the registry.
    #[error("Unknown step '{0}': not found in the step registry")]
    UnknownStep(String),

    /// A different step definition is already registered under this name.
    #[error("Step '{0}' is already registered with a different definition")]
    DuplicateStep(String),

    /// The persisted snapshot uses a format this version cannot read.
    #[error("Unsupported pipeline format version {found} (expected {expected})")]
    UnsupportedFormat { found: u32, expected: u32 },

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A step function reported its own failure.
    #[error("Step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PipelineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Convenience constructor for step functions reporting a failure.
    pub fn step_failed(step: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::StepFailed {
            step: step.into(),
            reason: reason.into(),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NoSteps => "NO_STEPS",
            Self::NotCallable { .. } => "NOT_CALLABLE",
            Self::MissingTarget { .. } => "MISSING_TARGET",
            Self::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            Self::MissingParameter { .. } => "MISSING_PARAMETER",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::UnknownStep(_) => "UNKNOWN_STEP",
            Self::DuplicateStep(_) => "DUPLICATE_STEP",
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::StepFailed { .. } => "STEP_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error means the pipeline itself is misconfigured.
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::NoSteps
            | Self::NotCallable { .. }
            | Self::MissingTarget { .. }
            | Self::UnknownParameter { .. }
            | Self::MissingParameter { .. } => true,
            Self::WithContext { source, .. } => source.is_configuration_error(),
            _ => false,
        }
    }

    /// Check if this error means a step received input of the wrong type.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Self::Validation { .. } => true,
            Self::WithContext { source, .. } => source.is_validation_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PipelineError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PipelineError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PipelineError::Io(e).with_context(context))
    }
}
