//! Mesh simplification and decimation algorithms
//!
//! This crate reduces mesh complexity while preserving shape using quadric
//! error metrics and greedy edge collapse.

pub mod params;
pub mod quadric_decimation;
pub mod result;

pub use params::*;
pub use quadric_decimation::*;
pub use result::*;

use voxmesh_core::{Result, TriangleMesh};

/// Simplify a mesh by reducing the number of faces/vertices
pub trait MeshSimplifier {
    /// Simplify mesh with target reduction ratio (0.0 = no reduction, 1.0 = maximum reduction)
    fn simplify(&self, mesh: &TriangleMesh, reduction_ratio: f32) -> Result<TriangleMesh>;
}
