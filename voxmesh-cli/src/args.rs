//! Command line arguments

use crate::pipeline::{PipelineConfig, QualityLevel};
use clap::Parser;
use std::path::PathBuf;
use voxmesh_algorithms::IsoMode;
use voxmesh_reconstruction::MeshifyOptions;

#[derive(Parser, Debug, Clone)]
#[command(name = "voxmesh")]
#[command(version, about = "Convert a NIfTI voxel volume to a triangulated mesh", long_about = None)]
#[command(after_help = "The output extension sets the format: .gii, .mz3, .obj, .ply, .pial, .stl, .vtk\n\
Examples:\n  voxmesh voxels.nii mesh.obj\n  voxmesh bet.nii -i 22 custom.obj\n  \
voxmesh bet.nii -i b bright.obj\n  voxmesh img.nii -p 0 -r 1 large.ply\n  \
voxmesh atlas.nii -a labels.txt roi.gii")]
pub struct Args {
    /// Input NIfTI volume (.nii, or a .hdr/.img pair)
    pub input: PathBuf,

    /// Output mesh file
    pub output: PathBuf,

    /// Atlas label file with `index;name` lines, or 1 for an unnamed atlas
    #[arg(short = 'a', value_name = "FILE")]
    pub atlas: Option<String>,

    /// Bubble fill (0 = bubbles included, 1 = bubbles filled)
    #[arg(short = 'b', default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub bubbles: u8,

    /// Isosurface intensity (d = dark, m = medium, b = bright, or a number)
    #[arg(short = 'i', default_value = "m", allow_hyphen_values = true)]
    pub isolevel: IsoMode,

    /// Only keep the largest cluster (0 = all, 1 = largest)
    #[arg(short = 'l', default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub largest: u8,

    /// Pre-smoothing (0 = skip, 1 = smooth)
    #[arg(short = 'p', default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub presmooth: u8,

    /// Fraction of triangles to keep
    #[arg(short = 'r', default_value_t = 0.25)]
    pub reduce: f64,

    /// Quality (0 = fast, 1 = balanced, 2 = best)
    #[arg(short = 'q', default_value = "1")]
    pub quality: QualityLevel,

    /// Post-smoothing iterations
    #[arg(short = 's', default_value_t = 0)]
    pub smooth: usize,

    /// Verbose (0 = silent, 1 = verbose)
    #[arg(short = 'v', default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub verbose: u8,
}

impl Args {
    pub fn is_verbose(&self) -> bool {
        self.verbose > 0
    }
}

impl From<&Args> for PipelineConfig {
    fn from(args: &Args) -> Self {
        PipelineConfig::default()
            .with_iso(args.isolevel)
            .with_meshify(
                MeshifyOptions::default()
                    .with_pre_smooth(args.presmooth > 0)
                    .with_only_largest(args.largest > 0)
                    .with_fill_bubbles(args.bubbles > 0),
            )
            .with_reduce_fraction(args.reduce)
            .with_quality(args.quality)
            .with_smooth_iterations(args.smooth)
    }
}
