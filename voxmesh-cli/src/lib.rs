//! # voxmesh command line
//!
//! Converts a NIfTI volume into a mesh file, or an indexed atlas into one
//! mesh per label.

pub mod args;
pub mod atlas;
pub mod pipeline;

pub use args::Args;
pub use atlas::{convert_atlas, AtlasSummary};
pub use pipeline::{build_mesh, convert, PipelineConfig, PipelineReport, QualityLevel};

use anyhow::{Context, Result};
use std::time::Instant;
use tracing::debug;
use voxmesh_io::{read_nifti, MeshWriterRegistry};

/// What a run produced
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Single(PipelineReport),
    Atlas(AtlasSummary),
}

/// Load the input volume and convert it as the arguments describe.
pub fn run(args: &Args) -> Result<RunOutcome> {
    let config = PipelineConfig::from(args);
    config.validate()?;
    let registry = MeshWriterRegistry::with_defaults();
    // Resolve the writer before any work so a bad extension fails fast
    registry.writer_for_path(&args.output)?;

    let start = Instant::now();
    let volume = read_nifti(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    let [nx, ny, nz] = volume.dims();
    debug!(
        ms = start.elapsed().as_secs_f64() * 1000.0,
        nx, ny, nz, "load from disk"
    );

    match &args.atlas {
        Some(source) => {
            let max_label = atlas::label_count(&volume)?;
            let labels = atlas::load_labels(source, max_label);
            let summary =
                convert_atlas(&volume, &args.output, &labels, &config, &registry)?;
            Ok(RunOutcome::Atlas(summary))
        }
        None => {
            let report = convert(&volume, &args.output, &config, &registry)?;
            Ok(RunOutcome::Single(report))
        }
    }
}
