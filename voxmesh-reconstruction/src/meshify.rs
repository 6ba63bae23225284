//! Volume to mesh extraction with topology cleanup

use crate::marching_cubes::{MarchingCubes, MarchingCubesConfig, ScalarGrid};
use tracing::{debug, info};
use voxmesh_algorithms::{label_graph, label_volume, largest_by, Connectivity};
use voxmesh_core::{Error, Result, ScalarVolume, TriangleMesh};

/// Options controlling [`meshify`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeshifyOptions {
    /// Blur the field once before extraction
    pub pre_smooth: bool,
    /// Keep only the connected surface with the most triangles
    pub only_largest: bool,
    /// Fill enclosed background cavities before extraction
    pub fill_bubbles: bool,
}

impl Default for MeshifyOptions {
    fn default() -> Self {
        Self {
            pre_smooth: true,
            only_largest: true,
            fill_bubbles: false,
        }
    }
}

impl MeshifyOptions {
    #[must_use]
    pub fn with_pre_smooth(mut self, enabled: bool) -> Self {
        self.pre_smooth = enabled;
        self
    }

    #[must_use]
    pub fn with_only_largest(mut self, enabled: bool) -> Self {
        self.only_largest = enabled;
        self
    }

    #[must_use]
    pub fn with_fill_bubbles(mut self, enabled: bool) -> Self {
        self.fill_bubbles = enabled;
        self
    }
}

/// Extracted mesh with its counts.
#[derive(Debug, Clone)]
pub struct MeshifyResult {
    /// Surface in voxel coordinates
    pub mesh: TriangleMesh,
    pub vertex_count: usize,
    pub triangle_count: usize,
}

/// Extract the surface of `volume` at `isolevel`.
///
/// The caller's volume is never modified. Vertices are in voxel index
/// coordinates; apply the volume affine to move them to world space.
pub fn meshify(
    volume: &ScalarVolume,
    isolevel: f32,
    options: &MeshifyOptions,
) -> Result<MeshifyResult> {
    if volume.is_empty() {
        return Err(Error::InvalidData("volume has no voxels".to_string()));
    }
    if !isolevel.is_finite() {
        return Err(Error::InvalidData(format!(
            "isolevel {} is not finite",
            isolevel
        )));
    }

    let (min, _) = volume.value_range().ok_or_else(|| {
        Error::InvalidData("volume contains no finite intensities".to_string())
    })?;
    let fill = min.min(isolevel);

    let mut grid = ScalarGrid::padded(volume, fill)?;
    if options.pre_smooth {
        grid.blur()?;
        grid.reset_border(fill);
    }
    if options.fill_bubbles {
        let filled = fill_bubbles(&mut grid, isolevel)?;
        debug!(filled, "filled enclosed background voxels");
    }

    let mc = MarchingCubes::new(MarchingCubesConfig {
        iso_level: isolevel,
        ..Default::default()
    });
    let mut mesh = mc.extract_grid(&grid, [-1.0, -1.0, -1.0])?;

    if options.only_largest {
        keep_largest_component(&mut mesh)?;
    }

    info!(
        vertices = mesh.vertex_count(),
        triangles = mesh.face_count(),
        isolevel,
        "meshify complete"
    );

    Ok(MeshifyResult {
        vertex_count: mesh.vertex_count(),
        triangle_count: mesh.face_count(),
        mesh,
    })
}

/// Raise background voxels that cannot reach the grid border above the
/// isolevel. Returns the number of voxels changed.
fn fill_bubbles(grid: &mut ScalarGrid, isolevel: f32) -> Result<usize> {
    let background: Vec<bool> = grid.values.iter().map(|&v| v <= isolevel).collect();
    let labels = label_volume(&background, grid.dims, Connectivity::Six)?;
    if labels.count() <= 1 {
        return Ok(0);
    }

    let mut exterior = vec![false; labels.count() + 1];
    let [nx, ny, nz] = grid.dims;
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                if grid.on_border(x, y, z) {
                    exterior[labels.labels[grid.index(x, y, z)] as usize] = true;
                }
            }
        }
    }

    let raised = grid
        .values
        .iter()
        .copied()
        .filter(|&v| v > isolevel)
        .fold(f32::NEG_INFINITY, f32::max);
    if !raised.is_finite() {
        return Ok(0);
    }

    let mut filled = 0;
    for (value, &label) in grid.values.iter_mut().zip(labels.labels.iter()) {
        if label != 0 && !exterior[label as usize] {
            *value = raised;
            filled += 1;
        }
    }
    Ok(filled)
}

/// Drop every connected piece of `mesh` except the one with the most
/// triangles. The first discovered piece wins ties.
fn keep_largest_component(mesh: &mut TriangleMesh) -> Result<()> {
    let adjacency = mesh.vertex_adjacency();
    let mut active = vec![false; mesh.vertex_count()];
    for face in &mesh.faces {
        for &v in face {
            active[v] = true;
        }
    }
    let labels = label_graph(&adjacency, &active)?;
    if labels.count() <= 1 {
        return Ok(());
    }

    let mut triangles = vec![0usize; labels.count()];
    for face in &mesh.faces {
        triangles[labels.labels[face[0]] as usize - 1] += 1;
    }
    let keep = match largest_by(&triangles) {
        Some(label) => label,
        None => return Ok(()),
    };

    let before = mesh.face_count();
    mesh.retain_faces(|_, face| labels.labels[face[0]] == keep);
    let removed_vertices = mesh.remove_unreferenced_vertices();
    debug!(
        components = labels.count(),
        removed_triangles = before - mesh.face_count(),
        removed_vertices,
        "kept largest component"
    );
    Ok(())
}
