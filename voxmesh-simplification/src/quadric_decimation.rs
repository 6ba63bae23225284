//! Quadric error decimation by greedy edge collapse
//!
//! Work proceeds in passes. Each pass scores every interior edge with the
//! quadric error of its best merge position, orders the edges by cost and
//! collapses them cheapest first while the cost stays below a threshold that
//! grows from pass to pass. A vertex touched by a collapse is left alone for
//! the rest of the pass and rescored in the next one.
//!
//! Boundary vertices never move, so open meshes keep their outline.

use crate::params::{DecimateParams, DecimationTarget};
use crate::result::DecimationResult;
use crate::MeshSimplifier;
use tracing::{debug, info, warn};
use voxmesh_algorithms::CandidateSorter;
use voxmesh_core::{to_f32, to_f64, Point3d, Quadric, Result, TriangleMesh};

/// Cosine above which the two edges at a moved vertex count as collinear.
const SLIVER_COSINE: f64 = 0.999;

/// An edge scored for collapse. `v1` merges into `v0`.
#[derive(Debug, Clone)]
struct Candidate {
    v0: usize,
    v1: usize,
    position: Point3d,
    cost: f64,
}

/// Mutable mesh state during decimation.
struct CollapseState {
    positions: Vec<Point3d>,
    quadrics: Vec<Quadric>,
    faces: Vec<[usize; 3]>,
    face_alive: Vec<bool>,
    /// Incident faces per vertex; may hold dead faces until pruned
    vertex_faces: Vec<Vec<usize>>,
    /// Vertices on boundary or non-manifold edges
    locked: Vec<bool>,
    live_faces: usize,
}

impl CollapseState {
    fn from_mesh(mesh: &TriangleMesh) -> Self {
        let positions: Vec<Point3d> = mesh.vertices.iter().map(to_f64).collect();

        let faces: Vec<[usize; 3]> = mesh
            .faces
            .iter()
            .copied()
            .filter(|f| f[0] != f[1] && f[1] != f[2] && f[0] != f[2])
            .collect();
        if faces.len() != mesh.faces.len() {
            warn!(
                dropped = mesh.faces.len() - faces.len(),
                "dropped degenerate input faces"
            );
        }

        let mut quadrics = vec![Quadric::zero(); positions.len()];
        let mut vertex_faces = vec![Vec::new(); positions.len()];
        for (fi, &[a, b, c]) in faces.iter().enumerate() {
            let q = Quadric::from_triangle(&positions[a], &positions[b], &positions[c]);
            for v in [a, b, c] {
                quadrics[v] += q;
                vertex_faces[v].push(fi);
            }
        }

        let cleaned = TriangleMesh::from_vertices_and_faces(Vec::new(), faces.clone());
        let mut locked = vec![false; positions.len()];
        for ((a, b), count) in cleaned.edge_face_counts() {
            if count != 2 {
                locked[a] = true;
                locked[b] = true;
            }
        }

        Self {
            live_faces: faces.len(),
            face_alive: vec![true; faces.len()],
            positions,
            quadrics,
            faces,
            vertex_faces,
            locked,
        }
    }

    fn into_mesh(self) -> TriangleMesh {
        let faces: Vec<[usize; 3]> = self
            .faces
            .iter()
            .zip(self.face_alive.iter())
            .filter(|(_, alive)| **alive)
            .map(|(f, _)| *f)
            .collect();
        let vertices = self.positions.iter().map(to_f32).collect();
        let mut mesh = TriangleMesh::from_vertices_and_faces(vertices, faces);
        mesh.remove_unreferenced_vertices();
        mesh
    }

    /// Score every live edge whose endpoints are both free to move.
    fn collect_candidates(&self) -> Vec<Candidate> {
        let mut candidates = Vec::with_capacity(self.live_faces * 3 / 2);
        for (face, _) in self
            .faces
            .iter()
            .zip(self.face_alive.iter())
            .filter(|(_, alive)| **alive)
        {
            for k in 0..3 {
                let a = face[k];
                let b = face[(k + 1) % 3];
                // each interior edge is seen once from either side
                if a > b || self.locked[a] || self.locked[b] {
                    continue;
                }
                candidates.push(self.score(a, b));
            }
        }
        candidates
    }

    fn score(&self, a: usize, b: usize) -> Candidate {
        let q = self.quadrics[a] + self.quadrics[b];
        let position = q.optimal_position().unwrap_or_else(|| {
            let pa = self.positions[a];
            let pb = self.positions[b];
            let mid = Point3d::from((pa.coords + pb.coords) * 0.5);
            [mid, pa, pb]
                .into_iter()
                .min_by(|x, y| q.evaluate(x).total_cmp(&q.evaluate(y)))
                .unwrap_or(mid)
        });
        let cost = q.evaluate(&position).max(0.0);
        Candidate {
            v0: a,
            v1: b,
            position,
            cost,
        }
    }

    fn live_faces_of(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.vertex_faces[v]
            .iter()
            .copied()
            .filter(move |&f| self.face_alive[f])
    }

    /// Distinct vertices sharing a live face with `v`, excluding `skip`.
    fn neighbors(&self, v: usize, skip: usize) -> Vec<usize> {
        let mut out: Vec<usize> = self
            .live_faces_of(v)
            .flat_map(|f| self.faces[f])
            .filter(|&w| w != v && w != skip)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    fn can_collapse(&self, c: &Candidate, min_cos: f64) -> bool {
        let (a, b) = (c.v0, c.v1);

        let shared = self
            .live_faces_of(a)
            .filter(|&f| self.faces[f].contains(&b))
            .count();
        if shared != 2 {
            return false;
        }

        // link condition: only the two opposite vertices may be common
        let na = self.neighbors(a, b);
        let nb = self.neighbors(b, a);
        let common = na.iter().filter(|v| nb.binary_search(v).is_ok()).count();
        if common != 2 {
            return false;
        }

        // two faces collapsing onto the same vertex triple
        let sorted = |f: [usize; 3]| {
            let mut s = f;
            s.sort_unstable();
            s
        };
        let kept: Vec<[usize; 3]> = self
            .live_faces_of(a)
            .filter(|&f| !self.faces[f].contains(&b))
            .map(|f| sorted(self.faces[f]))
            .collect();
        for f in self.live_faces_of(b) {
            let face = self.faces[f];
            if face.contains(&a) {
                continue;
            }
            let remapped = sorted(face.map(|v| if v == b { a } else { v }));
            if kept.contains(&remapped) {
                return false;
            }
        }

        for (v, other) in [(a, b), (b, a)] {
            for f in self.live_faces_of(v) {
                let face = self.faces[f];
                if face.contains(&other) {
                    continue;
                }
                if self.flips(face, v, &c.position, min_cos) {
                    return false;
                }
            }
        }
        true
    }

    /// Whether moving `v` of `face` to `p` flips or flattens the face.
    fn flips(&self, face: [usize; 3], v: usize, p: &Point3d, min_cos: f64) -> bool {
        let k = match face.iter().position(|&w| w == v) {
            Some(k) => k,
            None => return false,
        };
        let o1 = self.positions[face[(k + 1) % 3]];
        let o2 = self.positions[face[(k + 2) % 3]];
        let old = self.positions[v];

        let d1 = o1 - p;
        let d2 = o2 - p;
        let (l1, l2) = (d1.norm(), d2.norm());
        if l1 < 1e-12 || l2 < 1e-12 {
            return true;
        }
        if (d1.dot(&d2) / (l1 * l2)).abs() > SLIVER_COSINE {
            return true;
        }

        let n_new = d1.cross(&d2);
        let n_old = (o1 - old).cross(&(o2 - old));
        let (len_new, len_old) = (n_new.norm(), n_old.norm());
        if len_new < 1e-24 {
            return true;
        }
        if len_old < 1e-24 {
            return false;
        }
        n_new.dot(&n_old) / (len_new * len_old) < min_cos
    }

    fn collapse(&mut self, c: &Candidate, dirty: &mut [bool]) {
        let (a, b) = (c.v0, c.v1);
        self.positions[a] = c.position;
        let qb = self.quadrics[b];
        self.quadrics[a] += qb;

        let b_faces = std::mem::take(&mut self.vertex_faces[b]);
        for &f in &b_faces {
            if !self.face_alive[f] {
                continue;
            }
            if self.faces[f].contains(&a) {
                self.face_alive[f] = false;
                self.live_faces -= 1;
            } else {
                for v in self.faces[f].iter_mut() {
                    if *v == b {
                        *v = a;
                    }
                }
                self.vertex_faces[a].push(f);
            }
        }

        let alive = &self.face_alive;
        self.vertex_faces[a].retain(|&f| alive[f]);

        dirty[a] = true;
        dirty[b] = true;
        for &f in &self.vertex_faces[a] {
            for v in self.faces[f] {
                dirty[v] = true;
            }
        }
    }

    /// Run collapse passes until `target` triangles remain, or in lossless
    /// mode (`target == None`) until no zero-cost collapse is left.
    /// Returns (passes, collapses).
    fn run_phase(
        &mut self,
        target: Option<usize>,
        params: &DecimateParams,
        sorter: &mut CandidateSorter,
    ) -> (usize, usize) {
        let min_cos = params.min_normal_cosine();
        let mut dirty = vec![false; self.positions.len()];
        let mut passes = 0;
        let mut collapses = 0;

        for pass in 0..params.max_passes {
            if target.map_or(false, |t| self.live_faces <= t) {
                break;
            }
            let candidates = self.collect_candidates();
            if candidates.is_empty() {
                break;
            }

            let threshold = match target {
                Some(_) => params.pass_threshold(pass),
                None => f64::EPSILON,
            };
            let costs: Vec<f64> = candidates.iter().map(|c| c.cost).collect();
            let order = sorter.argsort(&costs);

            dirty.fill(false);
            passes += 1;
            let mut pass_collapses = 0;
            let mut above_threshold = false;

            for &i in order {
                let c = &candidates[i];
                if c.cost > threshold {
                    above_threshold = true;
                    break;
                }
                if target.map_or(false, |t| self.live_faces <= t) {
                    break;
                }
                if dirty[c.v0] || dirty[c.v1] || !self.can_collapse(c, min_cos) {
                    continue;
                }
                self.collapse(c, &mut dirty);
                pass_collapses += 1;
            }

            collapses += pass_collapses;
            debug!(
                pass,
                threshold,
                candidates = candidates.len(),
                collapsed = pass_collapses,
                triangles = self.live_faces,
                "decimation pass"
            );

            if pass_collapses == 0 && (target.is_none() || !above_threshold) {
                break;
            }
        }

        (passes, collapses)
    }
}

/// Decimate `mesh` with quadric error metrics.
///
/// The output never has more triangles than the input. When the target is
/// unreachable the achieved count is returned and
/// [`DecimationResult::reached_target`] reports `false`.
pub fn decimate(mesh: &TriangleMesh, params: &DecimateParams) -> Result<DecimationResult> {
    mesh.validate()?;

    let original_triangles = mesh.face_count();
    let target_triangles = params.target.resolve(original_triangles);

    if mesh.is_empty() {
        return Ok(DecimationResult {
            mesh: mesh.clone(),
            original_triangles,
            final_triangles: original_triangles,
            target_triangles,
            collapses_performed: 0,
            passes: 0,
        });
    }

    info!(
        original_triangles,
        target_triangles = ?target_triangles,
        aggressiveness = params.aggressiveness,
        "Starting quadric decimation"
    );

    let mut state = CollapseState::from_mesh(mesh);
    let mut sorter = CandidateSorter::new();

    let (mut passes, mut collapses) = state.run_phase(target_triangles, params, &mut sorter);
    if params.finish_lossless && params.target != DecimationTarget::Lossless {
        let (p, c) = state.run_phase(None, params, &mut sorter);
        passes += p;
        collapses += c;
    }

    let mesh = state.into_mesh();
    let result = DecimationResult {
        final_triangles: mesh.face_count(),
        mesh,
        original_triangles,
        target_triangles,
        collapses_performed: collapses,
        passes,
    };

    info!(
        final_triangles = result.final_triangles,
        collapses = result.collapses_performed,
        passes = result.passes,
        reached_target = result.reached_target(),
        "Decimation complete"
    );
    Ok(result)
}

/// [`MeshSimplifier`] backed by [`decimate`].
#[derive(Debug, Clone, Default)]
pub struct QuadricDecimator {
    pub params: DecimateParams,
}

impl QuadricDecimator {
    pub fn new(params: DecimateParams) -> Self {
        Self { params }
    }
}

impl MeshSimplifier for QuadricDecimator {
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh> {
        let keep = 1.0 - f64::from(reduction_ratio).clamp(0.0, 1.0);
        let params = DecimateParams {
            target: DecimationTarget::Ratio(keep),
            ..self.params.clone()
        };
        Ok(decimate(mesh, &params)?.mesh)
    }
}
