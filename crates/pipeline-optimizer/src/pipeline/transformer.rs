//! The sequential step pipeline.
//!
//! [`StepPipeline`] holds an ordered list of [`Step`] records and applies
//! them one after another to an input table.

use crate::config::PipelineConfig;
use crate::data::Data;
use crate::error::{PipelineError, Result};
use crate::params::Params;
use crate::step::{Step, StepDefinition};
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// The fit / transform interface shared with estimator-style APIs.
pub trait Transformer {
    /// Learn whatever the transformer needs from `x` (and `y`).
    fn fit(&mut self, x: &DataFrame, y: Option<&Data>) -> Result<&mut Self>;

    /// Apply the transformation to `x`.
    fn transform(&self, x: &DataFrame, y: Option<&Data>) -> Result<Data>;

    /// `fit` followed by `transform`.
    fn fit_transform(&mut self, x: &DataFrame, y: Option<&Data>) -> Result<Data> {
        self.fit(x, y)?;
        self.transform(x, y)
    }
}

/// An ordered pipeline of step functions.
///
/// Steps run in registration order. Each step receives the output of the
/// previous one; the first receives a copy of the caller's table.
///
/// # Example
///
/// ```rust,ignore
/// use pipeline_optimizer::{StepPipeline, StepSignature, add_step, builtin};
///
/// let mut pipeline = StepPipeline::new();
/// let mut registrar = add_step(&mut pipeline);
/// registrar.register(StepSignature::new("scale").param("factor", 2), builtin::scale)?;
/// registrar.register(StepSignature::new("offset").param("value", 1), builtin::offset)?;
///
/// // {A: [1, 2, 3]} -> {A: [3, 5, 7]}
/// let result = pipeline.transform(&df, None)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct StepPipeline {
    steps: Vec<Step>,
    config: PipelineConfig,
}

// Steps are shared read-only during transform
static_assertions::assert_impl_all!(StepPipeline: Send, Sync);

impl StepPipeline {
    /// Create an empty pipeline with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty pipeline with the given configuration.
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            steps: Vec::new(),
            config,
        }
    }

    /// Create a pipeline pre-populated with step records.
    ///
    /// Entries are not validated here; non-callable entries are reported
    /// by [`transform`](Self::transform).
    pub fn from_steps(steps: Vec<Step>, config: PipelineConfig) -> Self {
        Self { steps, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Replace the configuration. Steps already registered are kept.
    pub fn set_config(&mut self, config: PipelineConfig) {
        self.config = config;
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Bound parameters of the step at `position`.
    pub fn params(&self, position: usize) -> Option<&Params> {
        self.steps.get(position).map(Step::params)
    }

    /// Append a step definition with optional bound parameters.
    ///
    /// `None` or an empty set means the step is called without extra
    /// keyword arguments, so its declared defaults apply.
    pub fn add(&mut self, definition: Arc<StepDefinition>, params: Option<Params>) {
        let step = Step::new(definition, params.unwrap_or_default());
        debug!(
            "Registered step '{}' at position {} with {} bound parameter(s)",
            step.name(),
            self.steps.len(),
            step.params().len()
        );
        self.steps.push(step);
    }

    /// Append a prebuilt step record.
    ///
    /// With `validate_on_register` enabled, a non-callable entry is
    /// rejected immediately.
    pub fn add_step(&mut self, step: Step) -> Result<()> {
        if self.config.validate_on_register && !step.is_callable() {
            return Err(PipelineError::NotCallable {
                position: self.steps.len(),
                name: step.name().to_string(),
            });
        }
        self.steps.push(step);
        Ok(())
    }

    /// Check that every step can run: at least one step and all callable.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(PipelineError::NoSteps);
        }
        for (position, step) in self.steps.iter().enumerate() {
            if !step.is_callable() {
                return Err(PipelineError::NotCallable {
                    position,
                    name: step.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Apply every step in order to a copy of `x`.
    ///
    /// Steps that declare a secondary input receive a copy of `y`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::NoSteps`] if nothing is registered.
    /// - [`PipelineError::NotCallable`] for a placeholder entry.
    /// - [`PipelineError::MissingTarget`] if a step needs `y` and it is `None`.
    /// - [`PipelineError::Validation`] in strict mode when a step would receive a Series.
    /// - Any error returned by a step, unchanged.
    pub fn transform(&self, x: &DataFrame, y: Option<&Data>) -> Result<Data> {
        self.transform_data(Data::Frame(x.clone()), y)
    }

    /// Like [`transform`](Self::transform), accepting either a frame or a series.
    pub fn transform_data(&self, x: Data, y: Option<&Data>) -> Result<Data> {
        if self.steps.is_empty() {
            return Err(PipelineError::NoSteps);
        }

        let start_time = Instant::now();
        info!(
            "Running pipeline with {} step(s) on {} {:?}",
            self.steps.len(),
            x.kind(),
            x.shape()
        );

        let mut current = x;
        for (position, step) in self.steps.iter().enumerate() {
            current = self.apply_step(position, step, current, y)?;
        }

        info!(
            "Pipeline finished in {} ms, output {} {:?}",
            start_time.elapsed().as_millis(),
            current.kind(),
            current.shape()
        );
        Ok(current)
    }

    fn apply_step(
        &self,
        position: usize,
        step: &Step,
        current: Data,
        y: Option<&Data>,
    ) -> Result<Data> {
        let definition = step.definition().ok_or_else(|| PipelineError::NotCallable {
            position,
            name: step.name().to_string(),
        })?;
        let signature = definition.signature();
        signature.check_binding(step.params())?;
        let params = signature.effective_params(step.params());

        let input = self.step_input(position, current)?;

        let target = if signature.takes_target() {
            match y {
                Some(y) => Some(y.clone()),
                None => {
                    return Err(PipelineError::MissingTarget {
                        position,
                        name: step.name().to_string(),
                    });
                }
            }
        } else {
            None
        };

        debug!(
            "Step {} '{}': input {:?}, target: {}",
            position,
            step.name(),
            input.shape(),
            target.is_some()
        );

        match definition.call(input, target, &params) {
            Ok(output) => {
                debug!(
                    "Step {} '{}' produced {} {:?}",
                    position,
                    step.name(),
                    output.kind(),
                    output.shape()
                );
                Ok(output)
            }
            Err(e) => {
                error!("Step {} '{}' failed: {}", position, step.name(), e);
                Err(e)
            }
        }
    }

    /// Turn the running value into the DataFrame the next step expects.
    fn step_input(&self, position: usize, current: Data) -> Result<DataFrame> {
        match current {
            Data::Frame(df) => Ok(df),
            Data::Series(s) if self.config.strict_input => Err(PipelineError::Validation {
                position,
                reason: format!("expected a DataFrame, found Series '{}'", s.name()),
            }),
            Data::Series(s) => {
                debug!(
                    "Step {}: converting Series '{}' into a single-column DataFrame",
                    position,
                    s.name()
                );
                Ok(s.into_frame())
            }
        }
    }
}

impl Transformer for StepPipeline {
    /// No state is learned; fitting only checks that the pipeline can run.
    fn fit(&mut self, _x: &DataFrame, _y: Option<&Data>) -> Result<&mut Self> {
        self.validate()?;
        Ok(self)
    }

    fn transform(&self, x: &DataFrame, y: Option<&Data>) -> Result<Data> {
        StepPipeline::transform(self, x, y)
    }
}
