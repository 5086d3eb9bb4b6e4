//! CLI entry point: run a saved pipeline over a CSV file.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use pipeline_optimizer::{Data, StepPipeline, StepRegistry};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Run a saved step pipeline over a CSV file",
    long_about = "Applies a pipeline saved as a JSON snapshot to a CSV file.\n\n\
                  Step names in the snapshot are resolved against the built-in steps.\n\n\
                  EXAMPLES:\n  \
                  # List the available steps\n  \
                  pipeline-optimizer --list-steps\n\n  \
                  # Show the steps of a saved pipeline\n  \
                  pipeline-optimizer -p pipeline.json --describe\n\n  \
                  # Transform a file\n  \
                  pipeline-optimizer -p pipeline.json -i data.csv -o out.csv\n\n  \
                  # Steps that need a target read it from a second file\n  \
                  pipeline-optimizer -p pipeline.json -i X.csv --target-file y.csv --target-column label"
)]
struct Args {
    /// Path to the pipeline snapshot (JSON)
    #[arg(short, long)]
    pipeline: Option<PathBuf>,

    /// Path to the CSV file to transform
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the transformed CSV (prints to stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// CSV file holding the secondary input (y)
    #[arg(long)]
    target_file: Option<PathBuf>,

    /// Column of the target file to use as y (the whole file when omitted)
    #[arg(long, requires = "target_file")]
    target_column: Option<String>,

    /// Require every step input to be a DataFrame
    #[arg(long)]
    strict: bool,

    /// Print the built-in steps and their parameters, then exit
    #[arg(long)]
    list_steps: bool,

    /// Print the steps of the pipeline, then exit
    #[arg(long)]
    describe: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet);

    let registry = StepRegistry::with_builtins();

    if args.list_steps {
        list_steps(&registry);
        return Ok(());
    }

    let pipeline_path = args
        .pipeline
        .as_deref()
        .ok_or_else(|| anyhow!("--pipeline is required unless --list-steps is given"))?;

    let mut pipeline = StepPipeline::load(pipeline_path, &registry)
        .with_context(|| format!("Failed to load pipeline {}", pipeline_path.display()))?;

    if args.describe {
        describe(&pipeline);
        return Ok(());
    }

    if args.strict {
        let mut config = *pipeline.config();
        config.strict_input = true;
        pipeline.set_config(config);
    }

    let input = args
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("--input is required to run the pipeline"))?;
    if !input.exists() {
        return Err(anyhow!("Input file not found: {}", input.display()));
    }

    info!("Loading dataset from: {}", input.display());
    let data = load_csv(input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let target = match &args.target_file {
        Some(path) => Some(load_target(path, args.target_column.as_deref())?),
        None => None,
    };

    let result = match pipeline.transform(&data, target.as_ref()) {
        Ok(result) => result,
        Err(e) => {
            error!("Pipeline failed: {}", e);
            return Err(anyhow!("Pipeline failed [{}]: {}", e.error_code(), e));
        }
    };

    let mut output = result.into_frame();
    match &args.output {
        Some(path) => {
            write_csv(&mut output, path)?;
            info!("Transformed dataset saved: {}", path.display());
        }
        None => println!("{output}"),
    }

    Ok(())
}

/// Print the built-in steps.
///
/// Uses `println!` since this listing is the command's output.
fn list_steps(registry: &StepRegistry) {
    println!("{:<16} {:<8} PARAMETERS", "STEP", "TARGET");
    println!("{}", "-".repeat(60));
    for definition in registry.definitions() {
        let signature = definition.signature();
        let params: Vec<String> = signature
            .params()
            .iter()
            .map(|p| match &p.default {
                Some(default) => format!("{}={}", p.name, default),
                None => p.name.clone(),
            })
            .collect();
        println!(
            "{:<16} {:<8} {}",
            signature.name(),
            if signature.takes_target() { "yes" } else { "no" },
            params.join(", ")
        );
    }
}

/// Print the steps of a loaded pipeline.
fn describe(pipeline: &StepPipeline) {
    println!(
        "Pipeline: {} step(s), strict input: {}",
        pipeline.len(),
        pipeline.config().strict_input
    );
    for (position, step) in pipeline.steps().iter().enumerate() {
        let status = if step.is_callable() { "" } else { " (not callable)" };
        let params: Vec<String> = step
            .params()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        println!(
            "  {}. {}({}){}",
            position + 1,
            step.name(),
            params.join(", "),
            status
        );
    }
}

fn load_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("Failed to read CSV {}", path.display()))?;
    Ok(df)
}

fn load_target(path: &Path, column: Option<&str>) -> Result<Data> {
    let df = load_csv(path)?;
    match column {
        Some(name) => {
            let series = df
                .column(name)
                .with_context(|| {
                    format!("Target column '{}' not found in {}", name, path.display())
                })?
                .as_materialized_series()
                .clone();
            Ok(Data::Series(series))
        }
        None => Ok(Data::Frame(df)),
    }
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)?;
    Ok(())
}
