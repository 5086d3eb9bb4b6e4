//! Saving and loading pipelines.
//!
//! A pipeline is persisted as a JSON snapshot of step names and their
//! bound parameters. Loading resolves every name against a
//! [`StepRegistry`], so the functions themselves never need to be
//! serialized.

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, ResultExt};
use crate::params::Params;
use crate::pipeline::StepPipeline;
use crate::step::{Step, StepRegistry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// Snapshot format written by this version.
pub const FORMAT_VERSION: u32 = 1;

/// One persisted step: its registry name and bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Params::is_empty")]
    pub params: Params,
}

/// Serializable form of a [`StepPipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSnapshot {
    pub format_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub config: PipelineConfig,
    pub steps: Vec<StepRecord>,
}

impl PipelineSnapshot {
    /// Capture the steps and bindings of `pipeline`.
    pub fn capture(pipeline: &StepPipeline) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            saved_at: Some(Utc::now()),
            config: *pipeline.config(),
            steps: pipeline
                .steps()
                .iter()
                .map(|step| StepRecord {
                    name: step.name().to_string(),
                    params: step.params().clone(),
                })
                .collect(),
        }
    }

    /// Rebuild a pipeline, leaving unknown names as non-callable entries.
    pub fn restore(self, registry: &StepRegistry) -> Result<StepPipeline> {
        self.check_version()?;
        let steps = self
            .steps
            .into_iter()
            .enumerate()
            .map(|(position, record)| match registry.get(&record.name) {
                Some(definition) => Step::new(definition, record.params),
                None => {
                    warn!(
                        "Step '{}' at position {} is not in the registry; it cannot be called",
                        record.name, position
                    );
                    Step::placeholder(record.name, record.params)
                }
            })
            .collect();
        Ok(StepPipeline::from_steps(steps, self.config))
    }

    /// Rebuild a pipeline, failing on the first unknown name.
    pub fn restore_strict(self, registry: &StepRegistry) -> Result<StepPipeline> {
        self.check_version()?;
        let steps = self
            .steps
            .into_iter()
            .map(|record| Ok(Step::new(registry.resolve(&record.name)?, record.params)))
            .collect::<Result<Vec<_>>>()?;
        Ok(StepPipeline::from_steps(steps, self.config))
    }

    fn check_version(&self) -> Result<()> {
        if self.format_version != FORMAT_VERSION {
            return Err(PipelineError::UnsupportedFormat {
                found: self.format_version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).context(format!("Failed to open {}", path.display()))?;
        let snapshot = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            PipelineError::Json(e).with_context(format!("Failed to parse {}", path.display()))
        })?;
        Ok(snapshot)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).context(format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

impl StepPipeline {
    /// Persist this pipeline to `path` as a JSON snapshot.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        PipelineSnapshot::capture(self).write(path)?;
        info!("Saved pipeline with {} step(s) to {}", self.len(), path.display());
        Ok(())
    }

    /// Load a pipeline saved with [`save`](Self::save).
    ///
    /// Names missing from `registry` load as non-callable entries and are
    /// reported when the pipeline is run.
    pub fn load(path: impl AsRef<Path>, registry: &StepRegistry) -> Result<Self> {
        let path = path.as_ref();
        let pipeline = PipelineSnapshot::read(path)?.restore(registry)?;
        info!("Loaded pipeline with {} step(s) from {}", pipeline.len(), path.display());
        Ok(pipeline)
    }

    /// Load a pipeline, failing with [`PipelineError::UnknownStep`] if any
    /// name is missing from `registry`.
    pub fn load_strict(path: impl AsRef<Path>, registry: &StepRegistry) -> Result<Self> {
        let path = path.as_ref();
        let pipeline = PipelineSnapshot::read(path)?.restore_strict(registry)?;
        info!("Loaded pipeline with {} step(s) from {}", pipeline.len(), path.display());
        Ok(pipeline)
    }
}
