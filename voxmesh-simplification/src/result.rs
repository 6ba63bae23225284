//! Result types for decimation operations.

use voxmesh_core::TriangleMesh;

/// Result of mesh decimation.
#[derive(Debug, Clone)]
pub struct DecimationResult {
    /// The decimated mesh.
    pub mesh: TriangleMesh,

    /// Number of triangles in original mesh.
    pub original_triangles: usize,

    /// Number of triangles in decimated mesh.
    pub final_triangles: usize,

    /// Triangle budget that was aimed for, `None` in lossless mode.
    pub target_triangles: Option<usize>,

    /// Number of edge collapses performed.
    pub collapses_performed: usize,

    /// Number of collapse passes run.
    pub passes: usize,
}

impl DecimationResult {
    /// Get the reduction ratio (final / original).
    #[must_use]
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_triangles == 0 {
            1.0
        } else {
            self.final_triangles as f64 / self.original_triangles as f64
        }
    }

    /// Whether the triangle budget was met. Always true in lossless mode.
    #[must_use]
    pub fn reached_target(&self) -> bool {
        self.target_triangles
            .map_or(true, |target| self.final_triangles <= target)
    }

    /// Check if any decimation occurred.
    #[must_use]
    pub const fn was_decimated(&self) -> bool {
        self.collapses_performed > 0
    }
}

impl std::fmt::Display for DecimationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Decimation: {} -> {} triangles ({:.1}% kept, {} collapses in {} passes)",
            self.original_triangles,
            self.final_triangles,
            self.reduction_ratio() * 100.0,
            self.collapses_performed,
            self.passes
        )
    }
}
