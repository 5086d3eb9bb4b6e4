//! Pipeline module.
//!
//! This module provides the step pipeline, the registrar used to populate
//! it, and snapshot persistence.

mod persistence;
mod registrar;
mod transformer;

pub use persistence::{FORMAT_VERSION, PipelineSnapshot, StepRecord};
pub use registrar::{StepRegistrar, add_step};
pub use transformer::{StepPipeline, Transformer};
