//! Configuration for step pipelines.
//!
//! This module provides configuration options using the builder pattern.

use serde::{Deserialize, Serialize};

/// Configuration for a [`StepPipeline`](crate::StepPipeline).
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use pipeline_optimizer::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .strict_input(true)
///     .validate_on_register(true)
///     .build();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Require every step input to be a DataFrame.
    ///
    /// When true, a Series passed as the initial input or returned by a
    /// non-terminal step fails with a validation error. When false, the
    /// Series is turned into a single-column DataFrame.
    /// Default: false
    pub strict_input: bool,

    /// Reject non-callable steps when they are added instead of at
    /// transform time.
    /// Default: false
    pub validate_on_register: bool,
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Configuration with every check enabled.
    pub fn strict() -> Self {
        Self {
            strict_input: true,
            validate_on_register: true,
        }
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    strict_input: Option<bool>,
    validate_on_register: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Enable or disable strict DataFrame input checking.
    pub fn strict_input(mut self, strict: bool) -> Self {
        self.strict_input = Some(strict);
        self
    }

    /// Enable or disable callability checks at registration time.
    pub fn validate_on_register(mut self, validate: bool) -> Self {
        self.validate_on_register = Some(validate);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> PipelineConfig {
        PipelineConfig {
            strict_input: self.strict_input.unwrap_or(false),
            validate_on_register: self.validate_on_register.unwrap_or(false),
        }
    }
}
