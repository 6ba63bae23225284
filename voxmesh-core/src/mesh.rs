//! Mesh data structures and functionality

use crate::error::{Error, Result};
use crate::point::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An indexed triangle mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3f>,
    pub faces: Vec<[usize; 3]>,
}

impl TriangleMesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Create a mesh from vertices and faces
    pub fn from_vertices_and_faces(vertices: Vec<Point3f>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Get the number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of faces
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Check if the mesh is empty
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Add a vertex to the mesh
    pub fn add_vertex(&mut self, vertex: Point3f) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a face to the mesh
    pub fn add_face(&mut self, face: [usize; 3]) {
        self.faces.push(face);
    }

    /// Check that every face index refers to an existing vertex.
    pub fn validate(&self) -> Result<()> {
        let n = self.vertices.len();
        for (fi, face) in self.faces.iter().enumerate() {
            if let Some(&bad) = face.iter().find(|&&v| v >= n) {
                return Err(Error::InvalidData(format!(
                    "face {} references vertex {} but the mesh has {} vertices",
                    fi, bad, n
                )));
            }
        }
        Ok(())
    }

    /// Unit normal of a face, `None` for zero-area faces.
    pub fn face_normal(&self, face: usize) -> Option<Vector3f> {
        let [a, b, c] = self.faces[face];
        let n = (self.vertices[b] - self.vertices[a]).cross(&(self.vertices[c] - self.vertices[a]));
        let len = n.norm();
        if len > f32::EPSILON && len.is_finite() {
            Some(n / len)
        } else {
            None
        }
    }

    /// Calculate face normals (zero vector for degenerate faces)
    pub fn calculate_face_normals(&self) -> Vec<Vector3f> {
        (0..self.faces.len())
            .map(|fi| self.face_normal(fi).unwrap_or_else(Vector3f::zeros))
            .collect()
    }

    /// Build the deduplicated vertex neighbor lists.
    pub fn vertex_adjacency(&self) -> VertexAdjacency {
        VertexAdjacency::from_faces(self.vertices.len(), &self.faces)
    }

    /// Number of faces sharing each undirected edge.
    pub fn edge_face_counts(&self) -> HashMap<(usize, usize), usize> {
        let mut counts = HashMap::with_capacity(self.faces.len() * 3 / 2);
        for face in &self.faces {
            for i in 0..3 {
                let a = face[i];
                let b = face[(i + 1) % 3];
                let key = if a < b { (a, b) } else { (b, a) };
                *counts.entry(key).or_insert(0usize) += 1;
            }
        }
        counts
    }

    /// Edges used by exactly one face.
    pub fn boundary_edge_count(&self) -> usize {
        self.edge_face_counts().values().filter(|&&c| c == 1).count()
    }

    /// Edges shared by more than two faces.
    pub fn non_manifold_edge_count(&self) -> usize {
        self.edge_face_counts().values().filter(|&&c| c > 2).count()
    }

    /// Per-vertex flag: lies on an edge used by exactly one face.
    pub fn boundary_vertices(&self) -> Vec<bool> {
        let mut boundary = vec![false; self.vertices.len()];
        for ((a, b), count) in self.edge_face_counts() {
            if count == 1 {
                boundary[a] = true;
                boundary[b] = true;
            }
        }
        boundary
    }

    /// A closed 2-manifold: every edge is shared by exactly two faces.
    pub fn is_watertight(&self) -> bool {
        !self.faces.is_empty() && self.edge_face_counts().values().all(|&c| c == 2)
    }

    /// V - E + F over the vertices actually referenced by faces.
    pub fn euler_characteristic(&self) -> i64 {
        let mut referenced = vec![false; self.vertices.len()];
        for face in &self.faces {
            for &v in face {
                referenced[v] = true;
            }
        }
        let v = referenced.iter().filter(|&&r| r).count() as i64;
        let e = self.edge_face_counts().len() as i64;
        v - e + self.faces.len() as i64
    }

    /// Signed enclosed volume; positive when faces wind outward.
    pub fn signed_volume(&self) -> f64 {
        self.faces
            .iter()
            .map(|&[a, b, c]| {
                let p0 = to_f64(&self.vertices[a]).coords;
                let p1 = to_f64(&self.vertices[b]).coords;
                let p2 = to_f64(&self.vertices[c]).coords;
                p0.dot(&p1.cross(&p2))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Reverse the winding of every face.
    pub fn flip_winding(&mut self) {
        for face in &mut self.faces {
            face.swap(1, 2);
        }
    }

    /// Keep only faces for which `keep` returns true.
    pub fn retain_faces<F>(&mut self, mut keep: F)
    where
        F: FnMut(usize, &[usize; 3]) -> bool,
    {
        let mut index = 0;
        self.faces.retain(|face| {
            let k = keep(index, face);
            index += 1;
            k
        });
    }

    /// Drop vertices no face refers to and remap indices.
    /// Returns the number of vertices removed.
    pub fn remove_unreferenced_vertices(&mut self) -> usize {
        const UNUSED: usize = usize::MAX;
        let mut remap = vec![UNUSED; self.vertices.len()];
        for face in &self.faces {
            for &v in face {
                remap[v] = 0;
            }
        }

        let mut next = 0;
        let mut kept = Vec::with_capacity(self.vertices.len());
        for (old, slot) in remap.iter_mut().enumerate() {
            if *slot != UNUSED {
                *slot = next;
                kept.push(self.vertices[old]);
                next += 1;
            }
        }

        for face in &mut self.faces {
            for v in face.iter_mut() {
                *v = remap[*v];
            }
        }

        let removed = self.vertices.len() - kept.len();
        self.vertices = kept;
        removed
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
    }
}

impl Default for TriangleMesh {
    fn default() -> Self {
        Self::new()
    }
}

/// Compressed vertex neighbor lists (sorted, without duplicates).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAdjacency {
    offsets: Vec<usize>,
    neighbors: Vec<usize>,
}

impl VertexAdjacency {
    /// Build from a face list over `vertex_count` vertices.
    pub fn from_faces(vertex_count: usize, faces: &[[usize; 3]]) -> Self {
        let mut degree = vec![0usize; vertex_count + 1];
        for face in faces {
            for &v in face {
                degree[v] += 2;
            }
        }

        let mut offsets = Vec::with_capacity(vertex_count + 1);
        let mut total = 0;
        for d in &degree[..vertex_count] {
            offsets.push(total);
            total += d;
        }
        offsets.push(total);

        let mut fill = offsets.clone();
        let mut raw = vec![0usize; total];
        for face in faces {
            for i in 0..3 {
                let v = face[i];
                raw[fill[v]] = face[(i + 1) % 3];
                raw[fill[v] + 1] = face[(i + 2) % 3];
                fill[v] += 2;
            }
        }

        // Sort and dedup each slice, compacting in place.
        let mut neighbors = Vec::with_capacity(total);
        let mut compact_offsets = Vec::with_capacity(vertex_count + 1);
        for v in 0..vertex_count {
            compact_offsets.push(neighbors.len());
            let slice = &mut raw[offsets[v]..offsets[v + 1]];
            slice.sort_unstable();
            let mut last = None;
            for &n in slice.iter() {
                if Some(n) != last && n != v {
                    neighbors.push(n);
                    last = Some(n);
                }
            }
        }
        compact_offsets.push(neighbors.len());

        Self {
            offsets: compact_offsets,
            neighbors,
        }
    }

    /// Number of vertices covered.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Neighbors of vertex `v`.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.neighbors[self.offsets[v]..self.offsets[v + 1]]
    }

    /// Number of distinct neighbors of vertex `v`.
    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.offsets[v + 1] - self.offsets[v]
    }
}
