//! Sequential Transformer Pipelines
//!
//! Compose plain step functions over Polars DataFrames into a single
//! transformer with a `fit` / `transform` interface.
//!
//! # Overview
//!
//! - **Steps**: any `Fn(DataFrame, Option<Data>, &Params) -> Result<Data>`,
//!   described by a [`StepSignature`] (name, secondary input, defaults)
//! - **Registration**: [`add_step`] binds a step's declared defaults and
//!   appends it to a [`StepPipeline`]
//! - **Execution**: [`StepPipeline::transform`] applies steps in order to a
//!   copy of the input, passing a copy of the secondary input (`y`) to the
//!   steps that declare it
//! - **Persistence**: pipelines save as JSON snapshots of step names and
//!   bound parameters, and load again against a [`StepRegistry`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use pipeline_optimizer::{add_step, Data, Params, StepPipeline, StepRegistry, StepSignature};
//! use polars::prelude::*;
//!
//! let mut pipeline = StepPipeline::new();
//! let mut registry = StepRegistry::new();
//!
//! add_step(&mut pipeline)
//!     .with_registry(&mut registry)
//!     .register(StepSignature::new("double").param("factor", 2), |x, _y, params| {
//!         let factor = params.get_i64("factor")?;
//!         Ok(Data::Frame(pipeline_optimizer::utils::map_numeric_columns(x, |s| Ok(s * factor))?))
//!     })?;
//!
//! let df = df!("A" => [1i64, 2, 3])?;
//! let result = pipeline.transform(&df, None)?;
//!
//! pipeline.save("pipeline.json")?;
//! let reloaded = StepPipeline::load("pipeline.json", &registry)?;
//! ```
//!
//! # Secondary input
//!
//! Steps declared with [`StepSignature::with_target`] receive a copy of the
//! `y` passed to `transform`. Calling `transform` without `y` on such a
//! pipeline fails with [`PipelineError::MissingTarget`].

pub mod config;
pub mod data;
pub mod error;
pub mod params;
pub mod pipeline;
pub mod step;
pub mod utils;

// Re-exports for convenient access
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use data::Data;
pub use error::{PipelineError, Result as PipelineResult, ResultExt};
pub use params::Params;
pub use pipeline::{
    FORMAT_VERSION, PipelineSnapshot, StepPipeline, StepRecord, StepRegistrar, Transformer,
    add_step,
};
pub use step::{ParamSpec, Step, StepDefinition, StepFn, StepRegistry, StepSignature, builtin};
