//! Step functions and their declared signatures.
//!
//! A step is an ordinary function over a DataFrame. Instead of inspecting
//! the function at runtime, each step carries a [`StepSignature`] that
//! declares its name, whether it takes a secondary input (`y`), and which
//! keyword parameters it accepts together with their defaults.

pub mod builtin;
mod registry;

pub use registry::StepRegistry;

use crate::data::Data;
use crate::error::{PipelineError, Result};
use crate::params::Params;
use polars::prelude::DataFrame;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A step function: `(table, secondary input, bound parameters) -> table or series`.
///
/// The secondary input is `Some` only for steps whose signature declares
/// [`takes_target`](StepSignature::takes_target).
pub type StepFn = Arc<dyn Fn(DataFrame, Option<Data>, &Params) -> Result<Data> + Send + Sync>;

/// A keyword parameter declared by a step.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub default: Option<Value>,
}

/// Explicit description of a step function's parameter contract.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSignature {
    name: String,
    takes_target: bool,
    params: Vec<ParamSpec>,
}

impl StepSignature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            takes_target: false,
            params: Vec::new(),
        }
    }

    /// Declare that the step takes the secondary input `y`.
    pub fn with_target(mut self) -> Self {
        self.takes_target = true;
        self
    }

    /// Declare a parameter with a default value.
    pub fn param(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    /// Declare a parameter that has no default and must be bound explicitly.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            default: None,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn takes_target(&self) -> bool {
        self.takes_target
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    pub fn declares(&self, param: &str) -> bool {
        self.params.iter().any(|p| p.name == param)
    }

    /// The parameters that declare a default, bound to those defaults.
    pub fn defaults(&self) -> Params {
        self.params
            .iter()
            .filter_map(|p| p.default.clone().map(|d| (p.name.clone(), d)))
            .collect()
    }

    /// The parameters a step is called with: declared defaults, overridden
    /// by whatever is bound.
    pub fn effective_params(&self, bound: &Params) -> Params {
        let mut params = self.defaults();
        for (name, value) in bound {
            params.insert(name.clone(), value.clone());
        }
        params
    }

    /// Check a set of bound parameters against this signature.
    pub fn check_binding(&self, params: &Params) -> Result<()> {
        if let Some(unknown) = params.names().find(|name| !self.declares(name)) {
            return Err(PipelineError::UnknownParameter {
                step: self.name.clone(),
                param: unknown.to_string(),
            });
        }

        if let Some(missing) = self
            .params
            .iter()
            .find(|p| p.default.is_none() && !params.contains(&p.name))
        {
            return Err(PipelineError::MissingParameter {
                step: self.name.clone(),
                param: missing.name.clone(),
            });
        }

        Ok(())
    }
}

/// A step function together with its signature.
pub struct StepDefinition {
    signature: StepSignature,
    func: StepFn,
}

impl StepDefinition {
    pub fn new<F>(signature: StepSignature, func: F) -> Self
    where
        F: Fn(DataFrame, Option<Data>, &Params) -> Result<Data> + Send + Sync + 'static,
    {
        Self::from_fn(signature, Arc::new(func))
    }

    pub fn from_fn(signature: StepSignature, func: StepFn) -> Self {
        Self { signature, func }
    }

    pub fn name(&self) -> &str {
        self.signature.name()
    }

    pub fn signature(&self) -> &StepSignature {
        &self.signature
    }

    /// Shared handle to the step function.
    pub fn func(&self) -> StepFn {
        Arc::clone(&self.func)
    }

    /// Invoke the step directly.
    pub fn call(&self, x: DataFrame, y: Option<Data>, params: &Params) -> Result<Data> {
        (self.func)(x, y, params)
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// One registered entry of a pipeline: a step reference and its bound parameters.
///
/// An entry without a definition is a placeholder for a step that is not
/// callable, such as a name that did not resolve when a pipeline was
/// loaded.
#[derive(Debug, Clone)]
pub struct Step {
    name: String,
    definition: Option<Arc<StepDefinition>>,
    params: Params,
}

impl Step {
    pub fn new(definition: Arc<StepDefinition>, params: Params) -> Self {
        Self {
            name: definition.name().to_string(),
            definition: Some(definition),
            params,
        }
    }

    /// A named entry with nothing to call.
    pub fn placeholder(name: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            definition: None,
            params,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn definition(&self) -> Option<&Arc<StepDefinition>> {
        self.definition.as_ref()
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn is_callable(&self) -> bool {
        self.definition.is_some()
    }

    pub fn takes_target(&self) -> bool {
        self.definition
            .as_ref()
            .is_some_and(|def| def.signature().takes_target())
    }
}
