//! Per-label conversion of indexed atlases
//!
//! Every integer label of the atlas is meshed independently on the rayon
//! pool. Workers share the atlas volume read-only and report through
//! atomic counters.

use crate::pipeline::{self, PipelineConfig};
use anyhow::{bail, Result};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};
use voxmesh_algorithms::IsoMode;
use voxmesh_core::{Error, ScalarVolume};
use voxmesh_io::{AtlasLabels, MeshWriterRegistry};

/// Isolevel separating a label mask from its background
const MASK_ISOLEVEL: f32 = 0.5;

/// Highest label accepted, the range of a uint16 atlas
pub const MAX_ATLAS_LABEL: usize = u16::MAX as usize;

/// Outcome of an atlas conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasSummary {
    /// Highest label index in the atlas
    pub labels: usize,
    pub converted: usize,
    /// Labels with no voxels
    pub skipped: usize,
    pub failed: usize,
}

/// Highest label of an indexed atlas: the truncated maximum intensity.
/// Maxima above [`MAX_ATLAS_LABEL`] mean the image is not an atlas.
pub fn label_count(volume: &ScalarVolume) -> voxmesh_core::Result<usize> {
    let (min, max) = volume
        .value_range()
        .ok_or_else(|| Error::InvalidData("atlas has no finite intensities".to_string()))?;
    if max < 1.0 {
        return Err(Error::InvalidData(format!(
            "intensity range {}..{} is not consistent with an indexed atlas",
            min, max
        )));
    }
    if max > MAX_ATLAS_LABEL as f32 {
        return Err(Error::InvalidData(format!(
            "maximum intensity {} exceeds the largest atlas label {}",
            max, MAX_ATLAS_LABEL
        )));
    }
    Ok(max.trunc() as usize)
}

/// Binary mask of the voxels whose intensity rounds to `label`, or `None`
/// when the label is absent.
pub fn label_mask(volume: &ScalarVolume, label: usize) -> Option<ScalarVolume> {
    let lo = label as f32 - 0.5;
    let hi = label as f32 + 0.5;
    let inside = |v: f32| v > lo && v < hi;
    if !volume.data.iter().any(|&v| inside(v)) {
        return None;
    }
    Some(volume.map(|v| if inside(v) { 1.0 } else { 0.0 }))
}

/// Label names from `-a`: `1` means unnamed, anything else is a label file.
/// A missing or unreadable file falls back to numbered names.
pub fn load_labels(source: &str, max_label: usize) -> AtlasLabels {
    if source == "1" {
        return AtlasLabels::numbered(max_label);
    }
    match AtlasLabels::from_file(source, max_label) {
        Ok(labels) => labels,
        Err(e) => {
            warn!(file = source, error = %e, "unable to read atlas names, using label numbers");
            AtlasLabels::numbered(max_label)
        }
    }
}

/// Mesh every label of `volume` into its own file next to `output`.
///
/// Labels without a name in `labels` are counted as failed. Fails only when
/// no label could be converted.
pub fn convert_atlas(
    volume: &ScalarVolume,
    output: &Path,
    labels: &AtlasLabels,
    config: &PipelineConfig,
    registry: &MeshWriterRegistry,
) -> Result<AtlasSummary> {
    let max_label = label_count(volume)?;
    let config = config
        .clone()
        .with_iso(IsoMode::Value(MASK_ISOLEVEL))
        .with_meshify(config.meshify.clone().with_only_largest(false));

    let converted = AtomicUsize::new(0);
    let skipped = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    (1..=max_label).into_par_iter().for_each(|label| {
        let mask = match label_mask(volume, label) {
            Some(mask) => mask,
            None => {
                debug!(label, "no voxels with this intensity, skipping");
                skipped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        let path = match labels.output_path(output, label) {
            Some(path) => path,
            None => {
                warn!(label, "label has no output name");
                failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        match pipeline::convert(&mask, &path, &config, registry) {
            Ok(report) => {
                info!(
                    label,
                    path = %path.display(),
                    triangles = report.triangles,
                    "converted label"
                );
                converted.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                warn!(label, error = %format!("{:#}", e), "label failed");
                failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    let summary = AtlasSummary {
        labels: max_label,
        converted: converted.into_inner(),
        skipped: skipped.into_inner(),
        failed: failed.into_inner(),
    };
    info!(
        converted = summary.converted,
        skipped = summary.skipped,
        failed = summary.failed,
        "atlas conversion finished"
    );
    if summary.converted == 0 {
        bail!("none of the {} atlas labels could be converted", max_label);
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atlas() -> ScalarVolume {
        // Label 1 on the left, label 3 on the right, no label 2
        ScalarVolume::from_fn([20, 10, 10], |x, y, z| {
            let inner = (2..8).contains(&y) && (2..8).contains(&z);
            match x {
                2..=7 if inner => 1.0,
                12..=17 if inner => 3.0,
                _ => 0.0,
            }
        })
    }

    #[test]
    fn test_label_count() {
        assert_eq!(label_count(&atlas()).unwrap(), 3);
        let faint = ScalarVolume::from_fn([4, 4, 4], |x, _, _| x as f32 * 0.2);
        assert!(matches!(label_count(&faint), Err(Error::InvalidData(_))));
    }

    #[test]
    fn test_label_count_rejects_continuous_images() {
        let scan = ScalarVolume::from_fn([4, 4, 4], |x, _, _| if x == 3 { 1.0e9 } else { 0.0 });
        assert!(matches!(label_count(&scan), Err(Error::InvalidData(_))));

        let widest = ScalarVolume::from_fn([2, 2, 2], |x, _, _| {
            if x == 1 {
                MAX_ATLAS_LABEL as f32
            } else {
                0.0
            }
        });
        assert_eq!(label_count(&widest).unwrap(), MAX_ATLAS_LABEL);
    }

    #[test]
    fn test_label_mask() {
        let volume = atlas();
        let mask = label_mask(&volume, 3).unwrap();
        assert_eq!(mask.get(15, 5, 5), 1.0);
        assert_eq!(mask.get(5, 5, 5), 0.0);
        assert_eq!(mask.affine, volume.affine);
        assert!(label_mask(&volume, 2).is_none());
    }

    #[test]
    fn test_load_labels_fallback() {
        let labels = load_labels("1", 3);
        assert_eq!(labels, AtlasLabels::numbered(3));
        let labels = load_labels("/nonexistent/names.txt", 3);
        assert_eq!(labels.name(2), Some("2"));
    }

    #[test]
    fn test_convert_atlas() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("roi.obj");
        let labels = AtlasLabels::parse("3;Right", 3);
        let registry = MeshWriterRegistry::with_defaults();

        let summary = convert_atlas(
            &atlas(),
            &output,
            &labels,
            &PipelineConfig::default(),
            &registry,
        )
        .unwrap();

        assert_eq!(
            summary,
            AtlasSummary {
                labels: 3,
                converted: 2,
                skipped: 1,
                failed: 0
            }
        );
        assert!(dir.path().join("roi1.obj").exists());
        assert!(dir.path().join("roiRight.k3.obj").exists());
        assert!(!dir.path().join("roi2.obj").exists());
    }

    #[test]
    fn test_unnamed_label_counted_as_failed() {
        let dir = tempfile::tempdir().unwrap();
        // names cover labels 0..=1 only, the atlas also holds label 3
        let labels = AtlasLabels::numbered(1);
        let summary = convert_atlas(
            &atlas(),
            &dir.path().join("roi.obj"),
            &labels,
            &PipelineConfig::default(),
            &MeshWriterRegistry::with_defaults(),
        )
        .unwrap();
        assert_eq!(
            summary,
            AtlasSummary {
                labels: 3,
                converted: 1,
                skipped: 1,
                failed: 1
            }
        );
        assert!(dir.path().join("roi1.obj").exists());
    }

    #[test]
    fn test_all_labels_missing_fails() {
        let dir = tempfile::tempdir().unwrap();
        let volume = ScalarVolume::from_fn([6, 6, 6], |_, _, _| 0.0);
        let labels = AtlasLabels::numbered(2);
        let result = convert_atlas(
            &volume,
            &dir.path().join("roi.ply"),
            &labels,
            &PipelineConfig::default(),
            &MeshWriterRegistry::with_defaults(),
        );
        assert!(result.is_err());
    }
}
