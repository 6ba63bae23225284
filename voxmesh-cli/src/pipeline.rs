//! Volume to mesh file conversion
//!
//! Stages run in a fixed order: isolevel selection, extraction, voxel to
//! world transform, optional smoothing, optional decimation, writing.

use anyhow::{Context, Result};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info};
use voxmesh_algorithms::{select_isolevel, smooth_hc, IsoMode, SmoothParams};
use voxmesh_core::{Error, ScalarVolume, Transformable, TriangleMesh};
use voxmesh_io::{MeshWriteOptions, MeshWriterRegistry};
use voxmesh_reconstruction::{meshify, MeshifyOptions};
use voxmesh_simplification::{decimate, DecimateParams};

/// Speed and quality trade-off of decimation and output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityLevel {
    /// Aggressive decimation, ASCII output where the format allows it
    Fast,
    #[default]
    Balanced,
    /// Careful decimation followed by a lossless cleanup
    Best,
}

impl QualityLevel {
    pub fn aggressiveness(self) -> f64 {
        match self {
            QualityLevel::Fast => 8.0,
            QualityLevel::Balanced => 7.0,
            QualityLevel::Best => 5.0,
        }
    }

    pub fn finish_lossless(self) -> bool {
        self == QualityLevel::Best
    }

    pub fn binary_output(self) -> bool {
        self != QualityLevel::Fast
    }
}

impl FromStr for QualityLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "fast" => Ok(QualityLevel::Fast),
            "1" | "balanced" => Ok(QualityLevel::Balanced),
            "2" | "best" => Ok(QualityLevel::Best),
            _ => Err(format!("quality must be 0, 1 or 2, got '{}'", s)),
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityLevel::Fast => write!(f, "fast"),
            QualityLevel::Balanced => write!(f, "balanced"),
            QualityLevel::Best => write!(f, "best"),
        }
    }
}

/// Configuration for converting one volume
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// How the isolevel is chosen
    pub iso: IsoMode,
    pub meshify: MeshifyOptions,
    /// Fraction of triangles kept by decimation; 1.0 or more skips it
    pub reduce_fraction: f64,
    pub quality: QualityLevel,
    /// HC smoothing iterations after extraction, 0 to skip
    pub smooth_iterations: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            iso: IsoMode::Medium,
            meshify: MeshifyOptions::default(),
            reduce_fraction: 0.25,
            quality: QualityLevel::Balanced,
            smooth_iterations: 0,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn with_iso(mut self, iso: IsoMode) -> Self {
        self.iso = iso;
        self
    }

    #[must_use]
    pub fn with_meshify(mut self, options: MeshifyOptions) -> Self {
        self.meshify = options;
        self
    }

    #[must_use]
    pub fn with_reduce_fraction(mut self, fraction: f64) -> Self {
        self.reduce_fraction = fraction;
        self
    }

    #[must_use]
    pub fn with_quality(mut self, quality: QualityLevel) -> Self {
        self.quality = quality;
        self
    }

    #[must_use]
    pub fn with_smooth_iterations(mut self, iterations: usize) -> Self {
        self.smooth_iterations = iterations;
        self
    }

    pub fn validate(&self) -> voxmesh_core::Result<()> {
        if !self.reduce_fraction.is_finite() || self.reduce_fraction <= 0.0 {
            return Err(Error::InvalidData(format!(
                "reduction fraction must be positive, got {}",
                self.reduce_fraction
            )));
        }
        Ok(())
    }

    /// Decimation settings, `None` when the mesh is kept as extracted.
    pub fn decimate_params(&self) -> Option<DecimateParams> {
        let aggressiveness = self.quality.aggressiveness();
        if self.reduce_fraction < 1.0 {
            Some(
                DecimateParams::with_target_ratio(self.reduce_fraction)
                    .aggressiveness(aggressiveness)
                    .finish_lossless(self.quality.finish_lossless()),
            )
        } else if self.quality.finish_lossless() {
            Some(DecimateParams::lossless().aggressiveness(aggressiveness))
        } else {
            None
        }
    }

    pub fn smooth_params(&self) -> Option<SmoothParams> {
        (self.smooth_iterations > 0)
            .then(|| SmoothParams::default().with_iterations(self.smooth_iterations))
    }

    pub fn write_options(&self) -> MeshWriteOptions {
        MeshWriteOptions::default().with_binary(self.quality.binary_output())
    }
}

/// Wall clock time spent in each stage, in milliseconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTimings {
    pub meshify_ms: f64,
    pub smooth_ms: f64,
    pub simplify_ms: f64,
    pub write_ms: f64,
}

/// What a conversion produced
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub isolevel: f32,
    /// Triangles straight out of extraction
    pub extracted_triangles: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub timings: StageTimings,
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Extract, transform, smooth and decimate. The mesh is returned in world
/// coordinates; `timings.write_ms` is left at zero.
pub fn build_mesh(
    volume: &ScalarVolume,
    isolevel: f32,
    config: &PipelineConfig,
) -> voxmesh_core::Result<(TriangleMesh, PipelineReport)> {
    config.validate()?;
    let mut timings = StageTimings::default();

    let start = Instant::now();
    let extracted = meshify(volume, isolevel, &config.meshify)?;
    timings.meshify_ms = elapsed_ms(start);
    debug!(
        ms = timings.meshify_ms,
        triangles = extracted.triangle_count,
        "meshify"
    );
    let extracted_triangles = extracted.triangle_count;
    let mut mesh = extracted.mesh;
    mesh.transform(&volume.affine);

    if let Some(params) = config.smooth_params() {
        let start = Instant::now();
        let result = smooth_hc(&mut mesh, &params)?;
        timings.smooth_ms = elapsed_ms(start);
        debug!(
            ms = timings.smooth_ms,
            iterations = result.iterations_performed,
            "post-smooth"
        );
    }

    if let Some(params) = config.decimate_params() {
        let start = Instant::now();
        let result = decimate(&mesh, &params)?;
        timings.simplify_ms = elapsed_ms(start);
        debug!(ms = timings.simplify_ms, "{}", result);
        mesh = result.mesh;
    }

    let report = PipelineReport {
        isolevel,
        extracted_triangles,
        vertices: mesh.vertex_count(),
        triangles: mesh.face_count(),
        timings,
    };
    Ok((mesh, report))
}

/// Convert `volume` and write the mesh to `output`.
pub fn convert(
    volume: &ScalarVolume,
    output: &Path,
    config: &PipelineConfig,
    registry: &MeshWriterRegistry,
) -> Result<PipelineReport> {
    let isolevel = select_isolevel(volume, config.iso)
        .with_context(|| format!("cannot choose a {} isolevel", config.iso))?;
    debug!(isolevel, mode = %config.iso, "isolevel selected");

    let (mesh, mut report) = build_mesh(volume, isolevel, config)
        .with_context(|| format!("meshing at isolevel {} failed", isolevel))?;

    let start = Instant::now();
    registry
        .write_mesh(&mesh, output, &config.write_options())
        .with_context(|| format!("failed to write {}", output.display()))?;
    report.timings.write_ms = elapsed_ms(start);
    debug!(ms = report.timings.write_ms, path = %output.display(), "save to disk");

    info!(
        path = %output.display(),
        isolevel,
        vertices = report.vertices,
        triangles = report.triangles,
        "mesh written"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxmesh_core::{Point3f, Transform3D, Vector3};
    use voxmesh_simplification::DecimationTarget;

    fn ball(radius: f32) -> ScalarVolume {
        ScalarVolume::from_fn([24, 24, 24], |x, y, z| {
            let d = ((x as f32 - 11.5).powi(2)
                + (y as f32 - 11.5).powi(2)
                + (z as f32 - 11.5).powi(2))
            .sqrt();
            if d < radius {
                100.0
            } else {
                0.0
            }
        })
    }

    #[test]
    fn test_quality_levels() {
        assert_eq!("0".parse::<QualityLevel>().unwrap(), QualityLevel::Fast);
        assert_eq!("best".parse::<QualityLevel>().unwrap(), QualityLevel::Best);
        assert!("3".parse::<QualityLevel>().is_err());
        assert_eq!(QualityLevel::Fast.aggressiveness(), 8.0);
        assert_eq!(QualityLevel::Balanced.aggressiveness(), 7.0);
        assert_eq!(QualityLevel::Best.aggressiveness(), 5.0);
        assert!(!QualityLevel::Fast.binary_output());
        assert!(QualityLevel::Balanced.binary_output());
    }

    #[test]
    fn test_decimation_settings() {
        let config = PipelineConfig::default();
        let params = config.decimate_params().unwrap();
        assert_eq!(params.target, DecimationTarget::Ratio(0.25));
        assert_eq!(params.aggressiveness, 7.0);
        assert!(!params.finish_lossless);

        let keep_all = config.clone().with_reduce_fraction(1.0);
        assert!(keep_all.decimate_params().is_none());

        let lossless = keep_all.with_quality(QualityLevel::Best);
        let params = lossless.decimate_params().unwrap();
        assert_eq!(params.target, DecimationTarget::Lossless);
        assert_eq!(params.aggressiveness, 5.0);

        let best = config.with_quality(QualityLevel::Best);
        assert!(best.decimate_params().unwrap().finish_lossless);
    }

    #[test]
    fn test_smooth_settings() {
        assert!(PipelineConfig::default().smooth_params().is_none());
        let params = PipelineConfig::default()
            .with_smooth_iterations(4)
            .smooth_params()
            .unwrap();
        assert_eq!(params.iterations, 4);
    }

    #[test]
    fn test_build_mesh_reduces_and_transforms() {
        let volume = ball(8.0).with_affine(Transform3D::translation(Vector3::new(
            100.0, 0.0, 0.0,
        )));
        let config = PipelineConfig::default().with_reduce_fraction(0.5);
        let (mesh, report) = build_mesh(&volume, 50.0, &config).unwrap();

        assert!(report.triangles <= (report.extracted_triangles as f64 * 0.5).round() as usize);
        assert_eq!(report.triangles, mesh.face_count());
        assert!(mesh.is_watertight());
        assert!(mesh.signed_volume() > 0.0);
        assert!(mesh.vertices.iter().all(|v| v.x > 100.0 && v.x < 123.0));
    }

    #[test]
    fn test_mirroring_affine_keeps_outward_faces() {
        let mirror = Transform3D::scaling(Vector3::new(-1.0, 1.0, 1.0));
        let volume = ball(6.0).with_affine(mirror);
        let config = PipelineConfig::default().with_reduce_fraction(1.0);
        let (mesh, _) = build_mesh(&volume, 50.0, &config).unwrap();
        assert!(mesh.signed_volume() > 0.0);
        assert!(mesh.vertices.iter().all(|v: &Point3f| v.x <= 0.0));
    }

    #[test]
    fn test_invalid_reduction_rejected() {
        let config = PipelineConfig::default().with_reduce_fraction(0.0);
        assert!(matches!(
            build_mesh(&ball(6.0), 50.0, &config),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn test_convert_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ball.obj");
        let registry = MeshWriterRegistry::with_defaults();
        let report = convert(&ball(8.0), &path, &PipelineConfig::default(), &registry).unwrap();

        assert_eq!(report.isolevel, 50.0);
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), report.triangles);
        assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), report.vertices);
    }
}
