//! Laplacian smoothing with HC shrinkage correction.
//!
//! Each iteration first moves every vertex toward the centroid of its
//! neighbors, then pushes it back toward a blend of its original and previous
//! position to counter the volume loss of plain Laplacian smoothing.
//!
//! # Algorithm
//!
//! ```text
//! p_i = q_i + alpha * (centroid(N(i)) - q_i)
//! b_i = p_i - (w * o_i + (1 - w) * q_i)
//! q_i = p_i - (beta * b_i + (1 - beta) * mean(b_j for j in N(i)))
//! ```
//!
//! where `o` are the positions before smoothing started.

use tracing::debug;
use voxmesh_core::{Result, TriangleMesh, Vector3d, VertexAdjacency};

/// Parameters for [`smooth_hc`].
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothParams {
    /// Number of iterations
    pub iterations: usize,
    /// Laplacian step toward the neighbor centroid
    pub alpha: f64,
    /// Weight of a vertex's own correction versus its neighbors'
    pub beta: f64,
    /// Pull toward the original positions in the correction
    pub original_weight: f64,
    /// Keep boundary vertices fixed
    pub lock_boundary: bool,
}

impl Default for SmoothParams {
    fn default() -> Self {
        Self {
            iterations: 10,
            alpha: 1.0,
            beta: 0.5,
            original_weight: 0.1,
            lock_boundary: true,
        }
    }
}

impl SmoothParams {
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    #[must_use]
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    #[must_use]
    pub fn with_original_weight(mut self, weight: f64) -> Self {
        self.original_weight = weight;
        self
    }

    #[must_use]
    pub fn with_lock_boundary(mut self, lock: bool) -> Self {
        self.lock_boundary = lock;
        self
    }
}

/// Statistics of a smoothing run.
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothResult {
    pub iterations_performed: usize,
    /// Largest single vertex move in any iteration
    pub max_displacement: f64,
}

/// Smooth vertex positions in place. Faces are never touched.
pub fn smooth_hc(mesh: &mut TriangleMesh, params: &SmoothParams) -> Result<SmoothResult> {
    mesh.validate()?;
    if params.iterations == 0 || mesh.is_empty() {
        return Ok(SmoothResult {
            iterations_performed: 0,
            max_displacement: 0.0,
        });
    }

    let adjacency = mesh.vertex_adjacency();
    let locked = if params.lock_boundary {
        mesh.boundary_vertices()
    } else {
        vec![false; mesh.vertex_count()]
    };

    let original: Vec<Vector3d> = mesh
        .vertices
        .iter()
        .map(|v| Vector3d::new(v.x as f64, v.y as f64, v.z as f64))
        .collect();
    let mut current = original.clone();
    let mut max_displacement = 0.0_f64;

    for iteration in 0..params.iterations {
        let laplacian = laplacian_step(&current, &adjacency, &locked, params.alpha);

        let w = params.original_weight;
        let correction: Vec<Vector3d> = laplacian
            .iter()
            .zip(original.iter().zip(current.iter()))
            .map(|(p, (o, q))| p - (o * w + q * (1.0 - w)))
            .collect();

        let next: Vec<Vector3d> = (0..current.len())
            .map(|i| {
                let neighbors = adjacency.neighbors(i);
                if locked[i] || neighbors.is_empty() {
                    return current[i];
                }
                let mean_b = neighbors
                    .iter()
                    .map(|&j| correction[j])
                    .sum::<Vector3d>()
                    / neighbors.len() as f64;
                laplacian[i] - (correction[i] * params.beta + mean_b * (1.0 - params.beta))
            })
            .collect();

        let iter_max = next
            .iter()
            .zip(current.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0_f64, f64::max);
        max_displacement = max_displacement.max(iter_max);
        debug!(iteration, max_move = iter_max, "smoothing iteration");
        current = next;
    }

    for (vertex, p) in mesh.vertices.iter_mut().zip(current.iter()) {
        vertex.x = p.x as f32;
        vertex.y = p.y as f32;
        vertex.z = p.z as f32;
    }

    Ok(SmoothResult {
        iterations_performed: params.iterations,
        max_displacement,
    })
}

/// One plain Laplacian step of size `alpha`.
fn laplacian_step(
    positions: &[Vector3d],
    adjacency: &VertexAdjacency,
    locked: &[bool],
    alpha: f64,
) -> Vec<Vector3d> {
    (0..positions.len())
        .map(|i| {
            let neighbors = adjacency.neighbors(i);
            if locked[i] || neighbors.is_empty() {
                return positions[i];
            }
            let centroid =
                neighbors.iter().map(|&j| positions[j]).sum::<Vector3d>() / neighbors.len() as f64;
            positions[i] + (centroid - positions[i]) * alpha
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use voxmesh_core::Point3f;

    /// Regular grid in the xy-plane with a bump in the middle
    fn make_bumpy_grid(n: usize) -> TriangleMesh {
        let mut vertices = Vec::new();
        for y in 0..n {
            for x in 0..n {
                let z = if x == n / 2 && y == n / 2 { 1.0 } else { 0.0 };
                vertices.push(Point3f::new(x as f32, y as f32, z));
            }
        }
        let mut faces = Vec::new();
        for y in 0..n - 1 {
            for x in 0..n - 1 {
                let i = y * n + x;
                faces.push([i, i + 1, i + n]);
                faces.push([i + 1, i + n + 1, i + n]);
            }
        }
        TriangleMesh::from_vertices_and_faces(vertices, faces)
    }

    fn make_octahedron(scale: f32) -> TriangleMesh {
        TriangleMesh::from_vertices_and_faces(
            vec![
                Point3f::new(scale, 0.0, 0.0),
                Point3f::new(-scale, 0.0, 0.0),
                Point3f::new(0.0, scale, 0.0),
                Point3f::new(0.0, -scale, 0.0),
                Point3f::new(0.0, 0.0, scale),
                Point3f::new(0.0, 0.0, -scale),
            ],
            vec![
                [0, 2, 4],
                [2, 1, 4],
                [1, 3, 4],
                [3, 0, 4],
                [2, 0, 5],
                [1, 2, 5],
                [3, 1, 5],
                [0, 3, 5],
            ],
        )
    }

    #[test]
    fn test_identity_with_zero_weights() {
        let mut mesh = make_bumpy_grid(5);
        let before = mesh.clone();
        let params = SmoothParams::default()
            .with_iterations(5)
            .with_alpha(0.0)
            .with_beta(0.0);
        let result = smooth_hc(&mut mesh, &params).unwrap();
        assert_eq!(result.iterations_performed, 5);
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_faces_preserved_and_bump_reduced() {
        let mut mesh = make_bumpy_grid(7);
        let faces = mesh.faces.clone();
        let result = smooth_hc(&mut mesh, &SmoothParams::default().with_iterations(3)).unwrap();

        assert_eq!(mesh.faces, faces);
        assert!(result.max_displacement > 0.0);
        let peak = mesh.vertices[3 * 7 + 3].z;
        assert!(peak < 1.0, "peak {}", peak);
    }

    #[test]
    fn test_boundary_locked() {
        let mut mesh = make_bumpy_grid(5);
        let before = mesh.clone();
        smooth_hc(&mut mesh, &SmoothParams::default().with_iterations(4)).unwrap();
        let boundary = before.boundary_vertices();
        for (i, &b) in boundary.iter().enumerate() {
            if b {
                assert_eq!(mesh.vertices[i], before.vertices[i]);
            }
        }
    }

    #[test]
    fn test_hc_counters_shrinkage() {
        // One full Laplacian step collapses the octahedron onto its center;
        // the correction keeps half of the radius.
        let mut mesh = make_octahedron(1.0);
        smooth_hc(&mut mesh, &SmoothParams::default().with_iterations(1)).unwrap();
        for v in &mesh.vertices {
            assert_relative_eq!(v.coords.norm(), 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_octahedron_stays_symmetric() {
        let mut mesh = make_octahedron(2.0);
        smooth_hc(&mut mesh, &SmoothParams::default().with_iterations(2)).unwrap();
        let r0 = mesh.vertices[0].coords.norm();
        for v in &mesh.vertices {
            assert_relative_eq!(v.coords.norm(), r0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_repeated_runs_identical() {
        let mut a = make_bumpy_grid(9);
        let mut b = a.clone();
        let params = SmoothParams::default()
            .with_iterations(6)
            .with_lock_boundary(false);
        let ra = smooth_hc(&mut a, &params).unwrap();
        let rb = smooth_hc(&mut b, &params).unwrap();
        assert_eq!(a, b);
        assert_eq!(ra, rb);
    }

    #[test]
    fn test_invalid_mesh_rejected() {
        let mut mesh = make_octahedron(1.0);
        mesh.faces.push([0, 1, 42]);
        assert!(smooth_hc(&mut mesh, &SmoothParams::default()).is_err());
    }
}
