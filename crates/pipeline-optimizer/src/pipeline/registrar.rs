//! Registering step functions into a pipeline.
//!
//! [`add_step`] returns a [`StepRegistrar`] for a pipeline. Registering a
//! function binds the defaults declared in its [`StepSignature`] and hands
//! the function back, so it stays callable on its own.

use crate::data::Data;
use crate::error::Result;
use crate::params::Params;
use crate::pipeline::StepPipeline;
use crate::step::{StepDefinition, StepFn, StepRegistry, StepSignature};
use polars::prelude::DataFrame;
use std::sync::Arc;

/// Start registering steps into `pipeline`.
///
/// # Example
///
/// ```rust,ignore
/// let mut pipeline = StepPipeline::new();
/// let mut registry = StepRegistry::new();
///
/// let double = add_step(&mut pipeline)
///     .with_registry(&mut registry)
///     .register(StepSignature::new("double").param("factor", 2), builtin::scale)?;
///
/// // Still usable directly
/// let out = double(df, None, &Params::new().with("factor", 2))?;
/// ```
pub fn add_step(pipeline: &mut StepPipeline) -> StepRegistrar<'_> {
    StepRegistrar::new(pipeline)
}

/// Registers step functions into a pipeline, binding their declared defaults.
pub struct StepRegistrar<'a> {
    pipeline: &'a mut StepPipeline,
    registry: Option<&'a mut StepRegistry>,
}

impl<'a> StepRegistrar<'a> {
    pub fn new(pipeline: &'a mut StepPipeline) -> Self {
        Self {
            pipeline,
            registry: None,
        }
    }

    /// Also record every registered definition in `registry`, so a saved
    /// pipeline can be loaded again.
    pub fn with_registry(mut self, registry: &'a mut StepRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register `func` under `signature` and return it unchanged.
    ///
    /// Exactly the parameters that declare a default are bound, to those
    /// defaults. A signature without defaults binds nothing.
    ///
    /// # Errors
    ///
    /// With a registry attached, [`PipelineError::DuplicateStep`] if the
    /// name is taken by another definition. The pipeline is left unchanged.
    ///
    /// [`PipelineError::DuplicateStep`]: crate::PipelineError::DuplicateStep
    pub fn register<F>(&mut self, signature: StepSignature, func: F) -> Result<StepFn>
    where
        F: Fn(DataFrame, Option<Data>, &Params) -> Result<Data> + Send + Sync + 'static,
    {
        let definition = Arc::new(StepDefinition::new(signature, func));
        self.register_definition(definition)
    }

    /// Register an existing definition, such as one taken from a registry.
    pub fn register_definition(&mut self, definition: Arc<StepDefinition>) -> Result<StepFn> {
        if let Some(registry) = self.registry.as_deref_mut() {
            registry.insert(Arc::clone(&definition))?;
        }
        let defaults = definition.signature().defaults();
        let func = definition.func();
        self.pipeline.add(definition, Some(defaults));
        Ok(func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::step::builtin;
    use serde_json::json;

    #[test]
    fn test_register_binds_defaults() {
        let mut pipeline = StepPipeline::new();

        add_step(&mut pipeline)
            .register(
                StepSignature::new("example_step").param("param", 2),
                builtin::scale,
            )
            .unwrap();

        assert_eq!(pipeline.len(), 1);
        assert_eq!(pipeline.steps()[0].name(), "example_step");
        assert_eq!(pipeline.params(0).unwrap().get("param"), Some(&json!(2)));
        assert_eq!(pipeline.params(0).unwrap().len(), 1);
    }

    #[test]
    fn test_register_without_defaults() {
        let mut pipeline = StepPipeline::new();
        add_step(&mut pipeline)
            .register(
                StepSignature::new("select").required("column"),
                builtin::select_column,
            )
            .unwrap();
        assert!(pipeline.params(0).unwrap().is_empty());
    }

    #[test]
    fn test_returned_function_is_callable() {
        let mut pipeline = StepPipeline::new();
        let scale = add_step(&mut pipeline)
            .register(
                StepSignature::new("scale").param("factor", 2),
                builtin::scale,
            )
            .unwrap();

        let df = polars::df!("A" => [1i64, 2]).unwrap();
        let out = scale(df, None, &Params::new().with("factor", 4)).unwrap();
        assert_eq!(out, Data::Frame(polars::df!("A" => [4i64, 8]).unwrap()));
    }

    #[test]
    fn test_binding_is_a_snapshot() {
        let mut pipeline = StepPipeline::new();
        {
            let mut registrar = add_step(&mut pipeline);
            registrar
                .register(
                    StepSignature::new("scale").param("factor", 2),
                    builtin::scale,
                )
                .unwrap();
            registrar
                .register(
                    StepSignature::new("scale").param("factor", 10),
                    builtin::scale,
                )
                .unwrap();
        }

        assert_eq!(pipeline.params(0).unwrap().get("factor"), Some(&json!(2)));
        assert_eq!(pipeline.params(1).unwrap().get("factor"), Some(&json!(10)));
    }

    #[test]
    fn test_with_registry_records_definition() {
        let mut pipeline = StepPipeline::new();
        let mut registry = StepRegistry::new();

        {
            let mut registrar = add_step(&mut pipeline).with_registry(&mut registry);
            registrar
                .register(
                    StepSignature::new("scale").param("factor", 2),
                    builtin::scale,
                )
                .unwrap();
            registrar
                .register(
                    StepSignature::new("offset").param("value", 1),
                    builtin::offset,
                )
                .unwrap();
        }

        assert_eq!(pipeline.len(), 2);
        assert_eq!(registry.names(), vec!["offset", "scale"]);
    }

    #[test]
    fn test_with_registry_rejects_name_clash() {
        let mut pipeline = StepPipeline::new();
        let mut registry = StepRegistry::new();

        let mut registrar = add_step(&mut pipeline).with_registry(&mut registry);
        registrar
            .register(StepSignature::new("step"), builtin::standard_scale)
            .unwrap();
        let err = registrar
            .register(StepSignature::new("step"), builtin::min_max_scale)
            .err()
            .expect("name clash should be rejected");

        assert!(matches!(err, PipelineError::DuplicateStep(ref name) if name == "step"));
        assert_eq!(pipeline.len(), 1);
    }

    #[test]
    fn test_same_function_twice_keeps_both_bindings() {
        let mut pipeline = StepPipeline::new();
        let mut registry = StepRegistry::new();
        let definition = registry
            .define(
                StepSignature::new("scale").param("factor", 2),
                builtin::scale,
            )
            .unwrap();

        {
            let mut registrar = add_step(&mut pipeline).with_registry(&mut registry);
            registrar
                .register_definition(Arc::clone(&definition))
                .unwrap();
            registrar
                .register_definition(Arc::clone(&definition))
                .unwrap();
        }
        pipeline.add(definition, Some(Params::new().with("factor", 3)));

        assert_eq!(pipeline.len(), 3);
        assert_eq!(registry.len(), 1);
        assert_eq!(pipeline.params(0).unwrap().get("factor"), Some(&json!(2)));
        assert_eq!(pipeline.params(1).unwrap().get("factor"), Some(&json!(2)));
        assert_eq!(pipeline.params(2).unwrap().get("factor"), Some(&json!(3)));
    }
}
