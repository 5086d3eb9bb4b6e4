//! Named lookup table of step definitions.
//!
//! Persisted pipelines store step names, not code. Loading a pipeline
//! resolves each name against a registry.

use super::{StepDefinition, StepSignature, builtin};
use crate::data::Data;
use crate::error::{PipelineError, Result};
use crate::params::Params;
use polars::prelude::DataFrame;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Registry of step definitions keyed by step name.
#[derive(Debug, Default, Clone)]
pub struct StepRegistry {
    steps: HashMap<String, Arc<StepDefinition>>,
}

impl StepRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry containing the built-in steps.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Define a step from a signature and a function and record it.
    pub fn define<F>(&mut self, signature: StepSignature, func: F) -> Result<Arc<StepDefinition>>
    where
        F: Fn(DataFrame, Option<Data>, &Params) -> Result<Data> + Send + Sync + 'static,
    {
        let definition = Arc::new(StepDefinition::new(signature, func));
        self.insert(Arc::clone(&definition))?;
        Ok(definition)
    }

    /// Record a definition.
    ///
    /// Re-inserting the same definition is a no-op. A different definition
    /// under a name that is already taken fails with
    /// [`PipelineError::DuplicateStep`], since a saved pipeline could no
    /// longer tell the two apart.
    pub fn insert(&mut self, definition: Arc<StepDefinition>) -> Result<()> {
        match self.steps.get(definition.name()) {
            Some(existing) if Arc::ptr_eq(existing, &definition) => Ok(()),
            Some(_) => Err(PipelineError::DuplicateStep(definition.name().to_string())),
            None => {
                self.steps.insert(definition.name().to_string(), definition);
                Ok(())
            }
        }
    }

    /// Record a definition, returning the one it replaced.
    pub fn replace(&mut self, definition: Arc<StepDefinition>) -> Option<Arc<StepDefinition>> {
        let name = definition.name().to_string();
        let previous = self.steps.insert(name.clone(), definition);
        if previous.is_some() {
            warn!("Replaced step definition '{}'", name);
        }
        previous
    }

    pub fn get(&self, name: &str) -> Option<Arc<StepDefinition>> {
        self.steps.get(name).cloned()
    }

    /// Look up a step, failing with [`PipelineError::UnknownStep`].
    pub fn resolve(&self, name: &str) -> Result<Arc<StepDefinition>> {
        self.get(name)
            .ok_or_else(|| PipelineError::UnknownStep(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// Registered step names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Registered definitions sorted by name.
    pub fn definitions(&self) -> Vec<&Arc<StepDefinition>> {
        let mut definitions: Vec<_> = self.steps.values().collect();
        definitions.sort_by(|a, b| a.name().cmp(b.name()));
        definitions
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passthrough(x: DataFrame, _y: Option<Data>, _params: &Params) -> Result<Data> {
        Ok(Data::Frame(x))
    }

    #[test]
    fn test_define_and_resolve() {
        let mut registry = StepRegistry::new();
        assert!(registry.is_empty());

        registry
            .define(StepSignature::new("passthrough"), passthrough)
            .unwrap();

        assert!(registry.contains("passthrough"));
        assert_eq!(registry.resolve("passthrough").unwrap().name(), "passthrough");
    }

    #[test]
    fn test_unknown_step() {
        let registry = StepRegistry::new();
        let err = registry.resolve("nope").unwrap_err();
        assert!(matches!(err, PipelineError::UnknownStep(ref name) if name == "nope"));
    }

    #[test]
    fn test_different_definition_under_taken_name() {
        let mut registry = StepRegistry::new();
        let first = registry
            .define(StepSignature::new("step"), passthrough)
            .unwrap();

        let err = registry
            .define(StepSignature::new("step").param("factor", 2), passthrough)
            .unwrap_err();
        assert!(matches!(err, PipelineError::DuplicateStep(ref name) if name == "step"));
        assert_eq!(err.error_code(), "DUPLICATE_STEP");
        assert!(Arc::ptr_eq(&registry.resolve("step").unwrap(), &first));

        registry.insert(Arc::clone(&first)).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_replace_overrides_explicitly() {
        let mut registry = StepRegistry::new();
        let first = registry
            .define(StepSignature::new("step"), passthrough)
            .unwrap();

        let second = Arc::new(StepDefinition::new(
            StepSignature::new("step").param("factor", 2),
            passthrough,
        ));
        let previous = registry.replace(second).unwrap();

        assert!(Arc::ptr_eq(&previous, &first));
        assert!(registry.resolve("step").unwrap().signature().declares("factor"));
    }

    #[test]
    fn test_builtins_are_sorted() {
        let registry = StepRegistry::with_builtins();
        let names = registry.names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(registry.contains("scale"));
        assert!(registry.contains("attach_target"));
    }
}
